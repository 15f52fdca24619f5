//! Use-case services above the store layer.
//!
//! # Responsibility
//! - Sequence multi-store writes (`coordinator` and its `*_ops` families).
//! - Own input normalization and the credential hashing seam.

pub mod attendance_ops;
pub mod coordinator;
pub mod credential;
pub mod normalize;
pub mod student_ops;
pub mod subject_ops;
pub mod teacher_ops;
