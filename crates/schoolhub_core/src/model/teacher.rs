//! Teacher domain model.
//!
//! # Responsibility
//! - Define the public teacher record and the credential-bearing account
//!   wrapper used only inside the store/coordinator boundary.
//! - Provide the set-union merge primitive for subject assignments.
//!
//! # Invariants
//! - `subject_ids` is a set: merging is idempotent and commutative.
//! - Every id in `subject_ids` names a subject whose `teacher_id` is this
//!   teacher (maintained by the coordinator, not by this type).
//! - `Teacher` never holds credential material; `TeacherAccount` is the only
//!   type that does and it is not serializable.

use crate::model::attendance::AttendanceEntry;
use crate::model::subject::{Subject, SubjectId};
use crate::model::{ClassId, SchoolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type TeacherId = Uuid;

pub const DEFAULT_TEACHER_ROLE: &str = "Teacher";

/// Public teacher record. Safe to serialize into any response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    /// Normalized (trimmed, lowercase) login email.
    pub email: String,
    pub role: String,
    pub school_id: SchoolId,
    pub class_id: Option<ClassId>,
    pub subject_ids: BTreeSet<SubjectId>,
    /// Sorted by date, one entry per calendar day.
    pub attendance: Vec<AttendanceEntry>,
}

impl Teacher {
    /// Adds subject ids to the assignment set.
    ///
    /// Returns the number of ids that were not already present.
    pub fn merge_subjects<I>(&mut self, subject_ids: I) -> usize
    where
        I: IntoIterator<Item = SubjectId>,
    {
        let before = self.subject_ids.len();
        self.subject_ids.extend(subject_ids);
        self.subject_ids.len() - before
    }

    pub fn teaches(&self, subject_id: SubjectId) -> bool {
        self.subject_ids.contains(&subject_id)
    }
}

/// Teacher plus its stored credential hash.
///
/// Deliberately not `Serialize`: the only way out to callers is
/// [`TeacherAccount::into_public`].
#[derive(Clone, PartialEq, Eq)]
pub struct TeacherAccount {
    pub teacher: Teacher,
    pub password_hash: String,
}

impl TeacherAccount {
    /// Output-sanitization step applied on every read path.
    pub fn into_public(self) -> Teacher {
        self.teacher
    }
}

impl std::fmt::Debug for TeacherAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeacherAccount")
            .field("teacher", &self.teacher)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Register-or-update request keyed by email.
///
/// `None` fields leave the stored value untouched on update. On create,
/// `password` and `school_id` are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherRegistration {
    pub email: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub school_id: Option<SchoolId>,
    pub class_id: Option<ClassId>,
    pub subject_ids: Vec<SubjectId>,
}

impl TeacherRegistration {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn school(mut self, school_id: SchoolId) -> Self {
        self.school_id = Some(school_id);
        self
    }

    pub fn class(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn subjects(mut self, subject_ids: impl IntoIterator<Item = SubjectId>) -> Self {
        self.subject_ids.extend(subject_ids);
        self
    }
}

/// Teacher read model with the resolved subject records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherDetail {
    pub teacher: Teacher,
    pub subjects: Vec<Subject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> Teacher {
        Teacher {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@school.test".to_string(),
            role: DEFAULT_TEACHER_ROLE.to_string(),
            school_id: Uuid::new_v4(),
            class_id: None,
            subject_ids: BTreeSet::new(),
            attendance: Vec::new(),
        }
    }

    #[test]
    fn merge_subjects_is_idempotent_and_counts_new_ids() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut t = teacher();

        assert_eq!(t.merge_subjects([a, b, a]), 2);
        assert_eq!(t.merge_subjects([b, c]), 1);
        assert_eq!(t.merge_subjects([a, b, c]), 0);
        assert_eq!(t.subject_ids.len(), 3);
    }

    #[test]
    fn account_debug_redacts_hash() {
        let account = TeacherAccount {
            teacher: teacher(),
            password_hash: "$2b$04$secret".to_string(),
        };
        let rendered = format!("{account:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
