//! Store layer: one repository per aggregate.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for subjects, teachers
//!   and students.
//! - Isolate SQLite query details from the coordinator.
//!
//! # Invariants
//! - A store only writes tables it owns; cross-store effects are sequenced
//!   by `service::coordinator`.
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod student_repo;
pub mod subject_repo;
pub mod teacher_repo;

use crate::db::DbError;
use crate::model::{ClassId, SchoolId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Id-targeted write hit no row.
    NotFound { entity: &'static str, id: Uuid },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Coarse filter used by bulk reads and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    School(SchoolId),
    Class(ClassId),
}

impl Scope {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::School(_) => "school",
            Self::Class(_) => "class",
        }
    }

    pub(crate) fn id(self) -> Uuid {
        match self {
            Self::School(id) | Self::Class(id) => id,
        }
    }

    /// Column holding the scope id on `subjects`, `teachers` and `students`.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::School(_) => "school_id",
            Self::Class(_) => "class_id",
        }
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_u32(value: i64, column: &'static str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value `{value}` out of range in {column}")))
}

/// Largest id list bound into a single `IN (...)` clause.
///
/// Longer lists are split so no statement nears SQLite's bind-variable limit.
pub(crate) const MAX_IN_BINDS: usize = 500;

/// Executes one statement per `MAX_IN_BINDS` slice of `ids` and sums the
/// changed rows. `leading` binds precede the ids in every statement.
pub(crate) fn execute_chunked(
    conn: &Connection,
    ids: &[Uuid],
    leading: &[Value],
    sql: impl Fn(&str) -> String,
) -> RepoResult<usize> {
    let mut changed = 0;
    for chunk in ids.chunks(MAX_IN_BINDS) {
        let mut binds = leading.to_vec();
        binds.extend(id_values(chunk));
        changed += conn.execute(&sql(&placeholders(chunk.len())), params_from_iter(binds))?;
    }
    Ok(changed)
}

/// Builds `?, ?, ?` for an `IN (...)` clause of `count` binds.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn id_values(ids: &[Uuid]) -> Vec<Value> {
    ids.iter().map(|id| Value::Text(id.to_string())).collect()
}
