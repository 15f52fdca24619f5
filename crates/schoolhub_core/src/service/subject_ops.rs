//! Subject creation, reads and the subject deletion family.
//!
//! # Invariants
//! - Single deletion strips the subject from teacher sets and from the
//!   matching student entries only.
//! - Scoped deletion collects ids before deleting, strips them from teacher
//!   sets, then resets the academic collections of ALL students. The coarse
//!   reset is intentional and differs from the single-delete path.

use crate::model::subject::{NewSubject, Subject, SubjectDetail, SubjectId, TeacherSummary};
use crate::model::{ClassId, SchoolId};
use crate::repo::student_repo::StudentStore;
use crate::repo::subject_repo::{SubjectQuery, SubjectStore};
use crate::repo::teacher_repo::TeacherStore;
use crate::repo::Scope;
use crate::service::coordinator::{
    log_scope, ConsistencyCoordinator, CoordinatorError, CoordinatorResult, SubjectDeletionSummary,
};
use crate::service::credential::CredentialHasher;
use crate::service::normalize::{normalize_name, normalize_subject_code};
use log::info;
use std::collections::BTreeSet;

impl<H: CredentialHasher> ConsistencyCoordinator<'_, H> {
    /// Creates a batch of subjects for one class.
    ///
    /// Fails with `Conflict` when any code already exists in the school or
    /// repeats inside the batch; nothing is inserted in that case.
    pub fn create_subjects(
        &self,
        class_id: ClassId,
        school_id: SchoolId,
        batch: &[NewSubject],
    ) -> CoordinatorResult<Vec<Subject>> {
        if batch.is_empty() {
            return Err(CoordinatorError::InvalidInput(
                "at least one subject is required".to_string(),
            ));
        }

        let mut subjects = Vec::with_capacity(batch.len());
        let mut seen_codes = BTreeSet::new();
        for item in batch {
            let name = normalize_name(&item.name).ok_or_else(|| {
                CoordinatorError::InvalidInput("subject name must not be blank".to_string())
            })?;
            let code = normalize_subject_code(&item.code).ok_or_else(|| {
                CoordinatorError::InvalidInput(format!("invalid subject code `{}`", item.code))
            })?;
            if !seen_codes.insert(code.clone()) {
                return Err(CoordinatorError::Conflict { school_id, code });
            }
            let normalized = NewSubject::new(name, code, item.session_count);
            subjects.push(Subject::from_new(&normalized, class_id, school_id));
        }

        self.write("subject_create", |stores| {
            let codes: Vec<String> = subjects.iter().map(|s| s.code.clone()).collect();
            if let Some(code) = stores.subjects.existing_codes(school_id, &codes)?.into_iter().next() {
                return Err(CoordinatorError::Conflict { school_id, code });
            }
            for subject in &subjects {
                stores.subjects.insert_subject(subject)?;
            }
            info!(
                "event=subject_create module=coordinator status=ok school_id={school_id} class_id={class_id} created={}",
                subjects.len()
            );
            Ok(())
        })?;

        Ok(subjects)
    }

    /// Lists every subject of a school. Empty when the school has none.
    pub fn list_subjects(&self, school_id: SchoolId) -> CoordinatorResult<Vec<Subject>> {
        self.list_with("subject_list", SubjectQuery {
            school_id: Some(school_id),
            ..SubjectQuery::default()
        })
    }

    pub fn list_subjects_by_class(&self, class_id: ClassId) -> CoordinatorResult<Vec<Subject>> {
        self.list_with("subject_list_by_class", SubjectQuery {
            class_id: Some(class_id),
            ..SubjectQuery::default()
        })
    }

    /// Lists subjects of a class that have no assigned teacher.
    pub fn list_unassigned_subjects(&self, class_id: ClassId) -> CoordinatorResult<Vec<Subject>> {
        self.list_with("subject_list_unassigned", SubjectQuery {
            class_id: Some(class_id),
            unassigned_only: true,
            ..SubjectQuery::default()
        })
    }

    fn list_with(&self, event: &'static str, query: SubjectQuery) -> CoordinatorResult<Vec<Subject>> {
        self.read(event, |stores| Ok(stores.subjects.list_subjects(&query)?))
    }

    /// Loads one subject with its assigned teacher resolved.
    pub fn get_subject_detail(&self, subject_id: SubjectId) -> CoordinatorResult<SubjectDetail> {
        self.read("subject_detail", |stores| {
            let subject = stores
                .subjects
                .get_subject(subject_id)?
                .ok_or(CoordinatorError::SubjectNotFound(subject_id))?;
            let teacher = match subject.teacher_id {
                Some(teacher_id) => stores
                    .teachers
                    .get_account(teacher_id)?
                    .map(|account| account.into_public())
                    .map(|teacher| TeacherSummary {
                        id: teacher.id,
                        name: teacher.name,
                    }),
                None => None,
            };
            Ok(SubjectDetail { subject, teacher })
        })
    }

    /// Deletes one subject and every reference to it.
    ///
    /// Steps: delete subject, pull id from teacher sets, drop matching
    /// student exam results, drop matching student attendance.
    pub fn delete_subject(&self, subject_id: SubjectId) -> CoordinatorResult<Subject> {
        self.write("subject_delete", |stores| {
            let subject = stores
                .subjects
                .get_subject(subject_id)?
                .ok_or(CoordinatorError::SubjectNotFound(subject_id))?;

            stores.subjects.delete_subject(subject_id)?;
            let teachers_updated = stores.teachers.remove_subjects_everywhere(&[subject_id])?;
            let removed = stores.students.remove_subject_entries(subject_id)?;

            info!(
                "event=subject_delete module=coordinator status=ok subject_id={subject_id} teachers_updated={teachers_updated} exam_results_removed={} attendance_removed={}",
                removed.exam_results, removed.attendance
            );
            Ok(subject)
        })
    }

    pub fn delete_subjects_by_school(
        &self,
        school_id: SchoolId,
    ) -> CoordinatorResult<SubjectDeletionSummary> {
        self.delete_subjects_in(Scope::School(school_id))
    }

    pub fn delete_subjects_by_class(
        &self,
        class_id: ClassId,
    ) -> CoordinatorResult<SubjectDeletionSummary> {
        self.delete_subjects_in(Scope::Class(class_id))
    }

    fn delete_subjects_in(&self, scope: Scope) -> CoordinatorResult<SubjectDeletionSummary> {
        self.write("subject_delete_scoped", |stores| {
            // Collect first: the delete below removes the rows the id set comes from.
            let ids = stores.subjects.collect_ids(scope)?;
            let deleted = stores.subjects.delete_subjects(&ids)?;
            let teachers_updated = stores.teachers.remove_subjects_everywhere(&ids)?;
            let students_reset = stores.students.reset_all_records()?;

            let summary = SubjectDeletionSummary {
                deleted,
                teachers_updated,
                students_reset,
            };
            log_scope(
                "subject_delete_scoped",
                scope,
                &format!(
                    "deleted={deleted} teachers_updated={teachers_updated} students_reset={students_reset}"
                ),
            );
            Ok(summary)
        })
    }
}
