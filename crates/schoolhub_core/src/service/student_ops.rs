//! Student registration and subject-scoped academic records.
//!
//! # Invariants
//! - An exam result or attendance entry is only written for a subject that
//!   exists at write time, inside the same transaction.

use crate::model::attendance::{calendar_day, AttendanceStatus};
use crate::model::student::{NewStudent, Student, StudentId};
use crate::model::subject::SubjectId;
use crate::repo::student_repo::StudentStore;
use crate::repo::subject_repo::SubjectStore;
use crate::service::coordinator::{
    ConsistencyCoordinator, CoordinatorError, CoordinatorResult, Stores,
};
use crate::service::credential::CredentialHasher;
use crate::service::normalize::normalize_name;
use chrono::NaiveDateTime;
use log::info;

impl<H: CredentialHasher> ConsistencyCoordinator<'_, H> {
    pub fn register_student(&self, new_student: NewStudent) -> CoordinatorResult<Student> {
        let name = normalize_name(&new_student.name).ok_or_else(|| {
            CoordinatorError::InvalidInput("student name must not be blank".to_string())
        })?;
        let student = NewStudent {
            name,
            ..new_student
        }
        .into_student();

        self.write("student_register", |stores| {
            stores.students.insert_student(&student)?;
            info!(
                "event=student_register module=coordinator status=ok student_id={} class_id={}",
                student.id, student.class_id
            );
            Ok(())
        })?;
        Ok(student)
    }

    pub fn get_student(&self, student_id: StudentId) -> CoordinatorResult<Student> {
        self.read("student_detail", |stores| {
            stores
                .students
                .get_student(student_id)?
                .ok_or(CoordinatorError::StudentNotFound(student_id))
        })
    }

    /// Sets the marks for one subject, replacing any previous result.
    pub fn record_exam_result(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        marks: u32,
    ) -> CoordinatorResult<Student> {
        self.write("student_exam_result", |stores| {
            ensure_student_and_subject(stores, student_id, subject_id)?;
            stores.students.upsert_exam_result(student_id, subject_id, marks)?;
            stores
                .students
                .get_student(student_id)?
                .ok_or(CoordinatorError::StudentNotFound(student_id))
        })
    }

    /// Records attendance for one subject on the calendar day of `at`.
    pub fn mark_student_attendance(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        at: NaiveDateTime,
        status: AttendanceStatus,
    ) -> CoordinatorResult<Student> {
        let day = calendar_day(at);
        self.write("student_attendance", |stores| {
            ensure_student_and_subject(stores, student_id, subject_id)?;
            stores
                .students
                .upsert_attendance(student_id, subject_id, day, status)?;
            stores
                .students
                .get_student(student_id)?
                .ok_or(CoordinatorError::StudentNotFound(student_id))
        })
    }
}

fn ensure_student_and_subject(
    stores: &Stores<'_>,
    student_id: StudentId,
    subject_id: SubjectId,
) -> CoordinatorResult<()> {
    if !stores.students.student_exists(student_id)? {
        return Err(CoordinatorError::StudentNotFound(student_id));
    }
    if stores.subjects.get_subject(subject_id)?.is_none() {
        return Err(CoordinatorError::SubjectNotFound(subject_id));
    }
    Ok(())
}
