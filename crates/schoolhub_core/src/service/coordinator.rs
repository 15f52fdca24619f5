//! Cross-store consistency coordinator.
//!
//! # Responsibility
//! - Be the only component that writes to more than one store.
//! - Run each operation as a fixed step sequence inside one SQLite
//!   transaction so a failed cascade step never leaves a dangling reference.
//!
//! # Invariants
//! - Teacher `subject_ids` and subject `teacher_id` always agree after an
//!   operation commits.
//! - No student record references a subject that no longer exists.
//! - Credential hashes never leave this module family; every teacher read
//!   path goes through `TeacherAccount::into_public`.
//!
//! Operation families live in sibling modules (`subject_ops`, `teacher_ops`,
//! `attendance_ops`, `student_ops`); this file owns the shared plumbing.

use crate::model::student::StudentId;
use crate::model::subject::{Subject, SubjectId};
use crate::model::teacher::{TeacherAccount, TeacherDetail, TeacherId};
use crate::model::SchoolId;
use crate::repo::student_repo::SqliteStudentStore;
use crate::repo::subject_repo::{SqliteSubjectStore, SubjectStore};
use crate::repo::teacher_repo::SqliteTeacherStore;
use crate::repo::{RepoError, Scope};
use crate::service::credential::{BcryptHasher, CredentialError, CredentialHasher};
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Errors surfaced by coordinator operations.
///
/// Validation outcomes are explicit variants; `Storage` carries unexpected
/// persistence failures unmodified.
#[derive(Debug)]
pub enum CoordinatorError {
    SubjectNotFound(SubjectId),
    TeacherNotFound(TeacherId),
    StudentNotFound(StudentId),
    /// Login or lookup by an email no teacher is registered with.
    TeacherEmailNotFound(String),
    /// Subject code already used in the school (or repeated in one batch).
    Conflict { school_id: SchoolId, code: String },
    InvalidCredential,
    InvalidInput(String),
    Credential(CredentialError),
    Storage(RepoError),
}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubjectNotFound(id) => write!(f, "subject not found: {id}"),
            Self::TeacherNotFound(id) => write!(f, "teacher not found: {id}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::TeacherEmailNotFound(email) => write!(f, "no teacher registered as {email}"),
            Self::Conflict { school_id, code } => {
                write!(f, "subject code `{code}` already exists in school {school_id}")
            }
            Self::InvalidCredential => write!(f, "invalid credential"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credential(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoordinatorError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "subject",
                id,
            } => Self::SubjectNotFound(id),
            RepoError::NotFound {
                entity: "teacher",
                id,
            } => Self::TeacherNotFound(id),
            RepoError::NotFound {
                entity: "student",
                id,
            } => Self::StudentNotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for CoordinatorError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}

impl From<CredentialError> for CoordinatorError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl CoordinatorError {
    /// Stable machine-readable code for logs and transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SubjectNotFound(_)
            | Self::TeacherNotFound(_)
            | Self::StudentNotFound(_)
            | Self::TeacherEmailNotFound(_) => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidCredential => "invalid_credential",
            Self::InvalidInput(_) => "invalid_input",
            Self::Credential(_) => "credential_failure",
            Self::Storage(_) => "storage_failure",
        }
    }

    /// Display text safe for logs. Emails are replaced by the error code.
    fn log_detail(&self) -> String {
        match self {
            Self::TeacherEmailNotFound(_) => self.code().to_string(),
            other => other.to_string(),
        }
    }
}

/// Counts reported by a bulk subject deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubjectDeletionSummary {
    pub deleted: usize,
    /// Teachers whose subject set lost at least one id.
    pub teachers_updated: usize,
    /// Students whose academic collections were reset.
    pub students_reset: usize,
}

/// Counts reported by a teacher deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeacherDeletionSummary {
    pub deleted: usize,
    /// Subjects whose back-reference was cleared.
    pub subjects_unassigned: usize,
}

/// Outcome of a scoped bulk deletion that distinguishes "nothing matched"
/// from an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkDeletion<S> {
    Deleted(S),
    NothingMatched,
}

impl<S> BulkDeletion<S> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NothingMatched)
    }
}

/// The three stores bound to one open transaction.
pub(crate) struct Stores<'tx> {
    pub(crate) subjects: SqliteSubjectStore<'tx>,
    pub(crate) teachers: SqliteTeacherStore<'tx>,
    pub(crate) students: SqliteStudentStore<'tx>,
}

impl<'tx> Stores<'tx> {
    fn new(conn: &'tx Connection) -> Self {
        Self {
            subjects: SqliteSubjectStore::new(conn),
            teachers: SqliteTeacherStore::new(conn),
            students: SqliteStudentStore::new(conn),
        }
    }

    /// Sanitizes an account and resolves its subjects.
    pub(crate) fn teacher_detail(&self, account: TeacherAccount) -> CoordinatorResult<TeacherDetail> {
        let teacher = account.into_public();
        let ids: Vec<SubjectId> = teacher.subject_ids.iter().copied().collect();
        let subjects = self.subjects.get_subjects(&ids)?;
        Ok(TeacherDetail { teacher, subjects })
    }
}

/// Application-level integrity service over the subject, teacher and
/// student stores.
pub struct ConsistencyCoordinator<'conn, H: CredentialHasher = BcryptHasher> {
    conn: &'conn Connection,
    pub(crate) hasher: H,
}

impl<'conn> ConsistencyCoordinator<'conn, BcryptHasher> {
    /// Creates a coordinator with the default bcrypt cost.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_hasher(conn, BcryptHasher::default())
    }
}

impl<'conn, H: CredentialHasher> ConsistencyCoordinator<'conn, H> {
    pub fn with_hasher(conn: &'conn Connection, hasher: H) -> Self {
        Self { conn, hasher }
    }

    /// Runs a multi-store write as one `IMMEDIATE` transaction.
    ///
    /// The transaction is rolled back when `op` returns an error.
    pub(crate) fn write<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&Stores<'_>) -> CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        self.run(event, TransactionBehavior::Immediate, op)
    }

    /// Runs a read inside a deferred transaction for a consistent snapshot.
    pub(crate) fn read<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&Stores<'_>) -> CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        self.run(event, TransactionBehavior::Deferred, op)
    }

    fn run<T>(
        &self,
        event: &'static str,
        behavior: TransactionBehavior,
        op: impl FnOnce(&Stores<'_>) -> CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, behavior)?;
        let outcome = op(&Stores::new(&tx));
        let outcome = match outcome {
            Ok(value) => tx.commit().map(|()| value).map_err(CoordinatorError::from),
            Err(err) => {
                drop(tx);
                Err(err)
            }
        };

        match outcome {
            Ok(value) => {
                debug!(
                    "event={event} module=coordinator status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event={event} module=coordinator status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err.log_detail()
                );
                Err(err)
            }
        }
    }
}

/// Loads every listed subject or fails on the first missing id.
pub(crate) fn require_subjects(
    stores: &Stores<'_>,
    ids: &[SubjectId],
) -> CoordinatorResult<Vec<Subject>> {
    let found = stores.subjects.get_subjects(ids)?;
    let found_ids: BTreeSet<SubjectId> = found.iter().map(|subject| subject.id).collect();
    if let Some(missing) = ids.iter().find(|id| !found_ids.contains(*id)) {
        return Err(CoordinatorError::SubjectNotFound(*missing));
    }
    Ok(found)
}

pub(crate) fn log_scope(event: &'static str, scope: Scope, detail: &str) {
    info!(
        "event={event} module=coordinator status=ok scope={} scope_id={} {detail}",
        scope.label(),
        scope.id()
    );
}
