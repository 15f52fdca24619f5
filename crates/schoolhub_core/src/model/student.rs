//! Student domain model.
//!
//! # Invariants
//! - Every `subject_id` in `exam_results` and `attendance` names an existing
//!   subject. Subject removal strips matching entries (single delete) or
//!   resets both collections for every student (bulk delete).
//! - At most one exam result per subject, one attendance entry per subject
//!   and calendar day.

use crate::model::attendance::AttendanceStatus;
use crate::model::subject::SubjectId;
use crate::model::{ClassId, SchoolId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StudentId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub subject_id: SubjectId,
    pub marks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAttendance {
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub roll_number: u32,
    pub school_id: SchoolId,
    pub class_id: ClassId,
    pub exam_results: Vec<ExamResult>,
    pub attendance: Vec<StudentAttendance>,
}

impl Student {
    /// True when any academic record references `subject_id`.
    pub fn references_subject(&self, subject_id: SubjectId) -> bool {
        self.exam_results.iter().any(|r| r.subject_id == subject_id)
            || self.attendance.iter().any(|a| a.subject_id == subject_id)
    }

    pub fn has_academic_records(&self) -> bool {
        !self.exam_results.is_empty() || !self.attendance.is_empty()
    }
}

/// Caller input for student registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: u32,
    pub school_id: SchoolId,
    pub class_id: ClassId,
}

impl NewStudent {
    pub fn into_student(self) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            roll_number: self.roll_number,
            school_id: self.school_id,
            class_id: self.class_id,
            exam_results: Vec::new(),
            attendance: Vec::new(),
        }
    }
}
