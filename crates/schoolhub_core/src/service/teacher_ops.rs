//! Teacher registration/merge, reads, authentication and the teacher
//! deletion family.
//!
//! # Invariants
//! - Subject assignment is a set union; re-registering with ids the teacher
//!   already owns is a no-op.
//! - Assigning a subject that points at another teacher also pulls the id
//!   out of that teacher's set.
//! - Deleting teachers clears subject back-references but keeps subjects.

use crate::model::subject::{Subject, SubjectId};
use crate::model::teacher::{
    Teacher, TeacherAccount, TeacherDetail, TeacherId, TeacherRegistration, DEFAULT_TEACHER_ROLE,
};
use crate::model::{ClassId, SchoolId};
use crate::repo::subject_repo::SubjectStore;
use crate::repo::teacher_repo::TeacherStore;
use crate::repo::Scope;
use crate::service::coordinator::{
    log_scope, require_subjects, BulkDeletion, ConsistencyCoordinator, CoordinatorError,
    CoordinatorResult, Stores, TeacherDeletionSummary,
};
use crate::service::credential::CredentialHasher;
use crate::service::normalize::{normalize_email, normalize_name};
use log::info;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

impl<H: CredentialHasher> ConsistencyCoordinator<'_, H> {
    /// Registers a new teacher or merges into the one with the same email.
    ///
    /// On merge, `subject_ids` are unioned into the existing set and only the
    /// provided optional fields overwrite stored values.
    pub fn register_teacher(&self, registration: TeacherRegistration) -> CoordinatorResult<TeacherDetail> {
        let email = normalize_email(&registration.email).ok_or_else(|| {
            CoordinatorError::InvalidInput("email is not a valid address".to_string())
        })?;
        let name = optional_field(registration.name.as_deref(), "name")?;
        let role = optional_field(registration.role.as_deref(), "role")?;
        let subject_ids = dedup(&registration.subject_ids);

        // Hashing stays outside the write transaction.
        let password_hash = match registration.password.as_deref() {
            Some(password) if password.is_empty() => {
                return Err(CoordinatorError::InvalidInput(
                    "password must not be empty".to_string(),
                ))
            }
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        self.write("teacher_register", |stores| {
            let subjects = require_subjects(stores, &subject_ids)?;

            let (teacher_id, created) = match stores.teachers.get_account_by_email(&email)? {
                None => {
                    let account = TeacherAccount {
                        teacher: Teacher {
                            id: Uuid::new_v4(),
                            name: name.ok_or_else(|| required("name"))?,
                            email: email.clone(),
                            role: role.unwrap_or_else(|| DEFAULT_TEACHER_ROLE.to_string()),
                            school_id: registration.school_id.ok_or_else(|| required("school_id"))?,
                            class_id: registration.class_id,
                            subject_ids: subject_ids.iter().copied().collect(),
                            attendance: Vec::new(),
                        },
                        password_hash: password_hash.ok_or_else(|| required("password"))?,
                    };
                    stores.teachers.insert_teacher(&account)?;
                    (account.teacher.id, true)
                }
                Some(mut account) => {
                    account.teacher.merge_subjects(subject_ids.iter().copied());
                    if let Some(name) = name {
                        account.teacher.name = name;
                    }
                    if let Some(role) = role {
                        account.teacher.role = role;
                    }
                    if let Some(school_id) = registration.school_id {
                        account.teacher.school_id = school_id;
                    }
                    if let Some(class_id) = registration.class_id {
                        account.teacher.class_id = Some(class_id);
                    }
                    if let Some(password_hash) = password_hash {
                        account.password_hash = password_hash;
                    }
                    stores.teachers.update_teacher(&account)?;
                    (account.teacher.id, false)
                }
            };

            let reassigned = assign_subjects(stores, teacher_id, &subjects)?;
            info!(
                "event=teacher_register module=coordinator status=ok teacher_id={teacher_id} created={created} subjects_assigned={} subjects_reassigned={reassigned}",
                subjects.len()
            );

            load_detail(stores, teacher_id)
        })
    }

    /// Unions `subject_ids` into an existing teacher's set.
    pub fn append_teacher_subjects(
        &self,
        teacher_id: TeacherId,
        subject_ids: &[SubjectId],
    ) -> CoordinatorResult<TeacherDetail> {
        let subject_ids = dedup(subject_ids);
        self.write("teacher_append_subjects", |stores| {
            let mut account = stores
                .teachers
                .get_account(teacher_id)?
                .ok_or(CoordinatorError::TeacherNotFound(teacher_id))?;
            let subjects = require_subjects(stores, &subject_ids)?;

            let added = account.teacher.merge_subjects(subject_ids.iter().copied());
            stores.teachers.update_teacher(&account)?;
            let reassigned = assign_subjects(stores, teacher_id, &subjects)?;

            info!(
                "event=teacher_append_subjects module=coordinator status=ok teacher_id={teacher_id} added={added} subjects_reassigned={reassigned}"
            );
            load_detail(stores, teacher_id)
        })
    }

    /// Verifies a login and returns the sanitized teacher.
    pub fn authenticate_teacher(&self, email: &str, password: &str) -> CoordinatorResult<TeacherDetail> {
        // Only normalized addresses are ever stored, so a malformed one is unknown.
        let normalized = normalize_email(email)
            .ok_or_else(|| CoordinatorError::TeacherEmailNotFound(email.trim().to_lowercase()))?;

        let (password_hash, detail) = self.read("teacher_authenticate", |stores| {
            let account = stores
                .teachers
                .get_account_by_email(&normalized)?
                .ok_or_else(|| CoordinatorError::TeacherEmailNotFound(normalized.clone()))?;
            let password_hash = account.password_hash.clone();
            Ok((password_hash, stores.teacher_detail(account)?))
        })?;

        if !self.hasher.verify(password, &password_hash)? {
            info!(
                "event=teacher_authenticate module=coordinator status=rejected teacher_id={}",
                detail.teacher.id
            );
            return Err(CoordinatorError::InvalidCredential);
        }
        Ok(detail)
    }

    /// Lists every teacher of a school. Empty when the school has none.
    pub fn list_teachers(&self, school_id: SchoolId) -> CoordinatorResult<Vec<TeacherDetail>> {
        self.read("teacher_list", |stores| {
            stores
                .teachers
                .list_accounts(school_id)?
                .into_iter()
                .map(|account| stores.teacher_detail(account))
                .collect()
        })
    }

    pub fn get_teacher_detail(&self, teacher_id: TeacherId) -> CoordinatorResult<TeacherDetail> {
        self.read("teacher_detail", |stores| load_detail(stores, teacher_id))
    }

    /// Deletes one teacher and unassigns its subjects.
    pub fn delete_teacher(&self, teacher_id: TeacherId) -> CoordinatorResult<Teacher> {
        self.write("teacher_delete", |stores| {
            let teacher = stores
                .teachers
                .get_account(teacher_id)?
                .ok_or(CoordinatorError::TeacherNotFound(teacher_id))?
                .into_public();

            stores.teachers.delete_teacher(teacher_id)?;
            let subjects_unassigned = stores.subjects.clear_teacher(&[teacher_id])?;

            info!(
                "event=teacher_delete module=coordinator status=ok teacher_id={teacher_id} subjects_unassigned={subjects_unassigned}"
            );
            Ok(teacher)
        })
    }

    pub fn delete_teachers_by_school(
        &self,
        school_id: SchoolId,
    ) -> CoordinatorResult<BulkDeletion<TeacherDeletionSummary>> {
        self.delete_teachers_in(Scope::School(school_id))
    }

    pub fn delete_teachers_by_class(
        &self,
        class_id: ClassId,
    ) -> CoordinatorResult<BulkDeletion<TeacherDeletionSummary>> {
        self.delete_teachers_in(Scope::Class(class_id))
    }

    fn delete_teachers_in(
        &self,
        scope: Scope,
    ) -> CoordinatorResult<BulkDeletion<TeacherDeletionSummary>> {
        self.write("teacher_delete_scoped", |stores| {
            let ids = stores.teachers.collect_ids(scope)?;
            let deleted = stores.teachers.delete_teachers(&ids)?;
            if deleted == 0 {
                log_scope("teacher_delete_scoped", scope, "deleted=0 outcome=nothing_matched");
                return Ok(BulkDeletion::NothingMatched);
            }

            let subjects_unassigned = stores.subjects.clear_teacher(&ids)?;
            log_scope(
                "teacher_delete_scoped",
                scope,
                &format!("deleted={deleted} subjects_unassigned={subjects_unassigned}"),
            );
            Ok(BulkDeletion::Deleted(TeacherDeletionSummary {
                deleted,
                subjects_unassigned,
            }))
        })
    }
}

/// Points `subjects` at `teacher_id`, pulling each one out of any previous
/// owner's set first. Returns how many subjects changed owner.
fn assign_subjects(
    stores: &Stores<'_>,
    teacher_id: TeacherId,
    subjects: &[Subject],
) -> CoordinatorResult<usize> {
    let mut previous_owners: BTreeMap<TeacherId, Vec<SubjectId>> = BTreeMap::new();
    for subject in subjects {
        if let Some(owner) = subject.teacher_id.filter(|owner| *owner != teacher_id) {
            previous_owners.entry(owner).or_default().push(subject.id);
        }
    }

    let mut reassigned = 0;
    for (owner, ids) in &previous_owners {
        stores.teachers.remove_subjects_from(*owner, ids)?;
        reassigned += ids.len();
    }

    let ids: Vec<SubjectId> = subjects.iter().map(|subject| subject.id).collect();
    stores.subjects.assign_teacher(&ids, teacher_id)?;
    Ok(reassigned)
}

fn load_detail(stores: &Stores<'_>, teacher_id: TeacherId) -> CoordinatorResult<TeacherDetail> {
    let account = stores
        .teachers
        .get_account(teacher_id)?
        .ok_or(CoordinatorError::TeacherNotFound(teacher_id))?;
    stores.teacher_detail(account)
}

fn dedup(ids: &[SubjectId]) -> Vec<SubjectId> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn optional_field(value: Option<&str>, field: &str) -> CoordinatorResult<Option<String>> {
    value
        .map(|raw| {
            normalize_name(raw)
                .ok_or_else(|| CoordinatorError::InvalidInput(format!("{field} must not be blank")))
        })
        .transpose()
}

fn required(field: &str) -> CoordinatorError {
    CoordinatorError::InvalidInput(format!("{field} is required for a new teacher"))
}
