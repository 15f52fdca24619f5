//! Core domain logic for SchoolHub.
//! This crate keeps subjects, teachers and students referentially consistent
//! without storage-level foreign keys.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::attendance::{AttendanceEntry, AttendanceStatus};
pub use model::student::{ExamResult, NewStudent, Student, StudentAttendance, StudentId};
pub use model::subject::{NewSubject, Subject, SubjectDetail, SubjectId, TeacherSummary};
pub use model::teacher::{Teacher, TeacherDetail, TeacherId, TeacherRegistration};
pub use model::{ClassId, SchoolId};
pub use repo::{RepoError, RepoResult, Scope};
pub use service::coordinator::{
    BulkDeletion, ConsistencyCoordinator, CoordinatorError, CoordinatorResult,
    SubjectDeletionSummary, TeacherDeletionSummary,
};
pub use service::credential::{BcryptHasher, CredentialError, CredentialHasher};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
