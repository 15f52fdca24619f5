//! Domain model for subjects, teachers and students.
//!
//! # Responsibility
//! - Define canonical records shared by stores and the coordinator.
//! - Provide the set-merge and calendar-day primitives the consistency
//!   protocol is built on.
//!
//! # Invariants
//! - Every record is identified by a stable v4 UUID.
//! - Schools and classes are external entities referenced by id only.
//! - Only `teacher::TeacherAccount` carries credential material, and it
//!   is neither `Serialize` nor printable through `Debug`.

pub mod attendance;
pub mod student;
pub mod subject;
pub mod teacher;

use uuid::Uuid;

/// External school identifier.
pub type SchoolId = Uuid;

/// External class identifier.
pub type ClassId = Uuid;
