//! Subject domain model.
//!
//! # Invariants
//! - `code` is unique within one school.
//! - `teacher_id` is a back-reference owned by the subject store; it is set
//!   and cleared only by the coordinator.

use crate::model::teacher::TeacherId;
use crate::model::{ClassId, SchoolId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SubjectId = Uuid;

/// Canonical subject record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub code: String,
    /// Planned number of sessions for the term.
    pub session_count: u32,
    pub class_id: ClassId,
    pub school_id: SchoolId,
    /// Assigned teacher, if any.
    pub teacher_id: Option<TeacherId>,
}

impl Subject {
    /// Builds an unassigned subject from a creation request.
    pub fn from_new(new: &NewSubject, class_id: ClassId, school_id: SchoolId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            code: new.code.trim().to_string(),
            session_count: new.session_count,
            class_id,
            school_id,
            teacher_id: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.teacher_id.is_some()
    }
}

/// Caller input for batch subject creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub session_count: u32,
}

impl NewSubject {
    pub fn new(name: impl Into<String>, code: impl Into<String>, session_count: u32) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            session_count,
        }
    }
}

/// Display projection of the assigned teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSummary {
    pub id: TeacherId,
    pub name: String,
}

/// Subject read model with its resolved teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDetail {
    pub subject: Subject,
    pub teacher: Option<TeacherSummary>,
}
