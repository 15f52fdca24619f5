//! Credential hashing seam.
//!
//! # Responsibility
//! - One-way hash and verify for teacher passwords.
//!
//! # Invariants
//! - Plain passwords and hashes are never logged.

use crate::config::CoreConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hashing backend failure (bad cost, malformed stored hash, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError(String);

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential hashing failed: {}", self.0)
    }
}

impl Error for CredentialError {}

impl From<bcrypt::BcryptError> for CredentialError {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self(value.to_string())
    }
}

/// One-way credential hashing used by teacher registration and login.
pub trait CredentialHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError>;
}

/// bcrypt-backed hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Uses an explicit work factor. bcrypt accepts `4..=31`.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::with_cost(config.password_cost)
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}
