//! Runtime configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve database path, logging settings and hashing cost in one place.
//!
//! # Invariants
//! - Resolution never panics; malformed values are reported as `ConfigError`.
//! - `log_dir`, when set, is absolute (enforced again by `init_logging`).

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "SCHOOLHUB_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SCHOOLHUB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SCHOOLHUB_LOG_DIR";
pub const ENV_PASSWORD_COST: &str = "SCHOOLHUB_PASSWORD_COST";

const DEFAULT_DB_FILE_NAME: &str = "schoolhub.sqlite3";
const MIN_PASSWORD_COST: u32 = 4;
const MAX_PASSWORD_COST: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    RelativeLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::RelativeLogDir(value) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub password_cost: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = value(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            let path = PathBuf::from(&dir);
            if !path.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir));
            }
            config.log_dir = Some(path);
        }
        if let Some(raw) = value(ENV_PASSWORD_COST) {
            config.password_cost = raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(cost))
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_PASSWORD_COST,
                    value: raw,
                })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(config.db_path.ends_with(DEFAULT_DB_FILE_NAME));
    }

    #[test]
    fn explicit_values_override_defaults_and_blank_is_unset() {
        let dir = std::env::temp_dir().join("schoolhub-logs");
        let dir_text = dir.to_str().unwrap().to_string();
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/srv/school.db"),
            (ENV_LOG_LEVEL, "  "),
            (ENV_LOG_DIR, dir_text.as_str()),
            (ENV_PASSWORD_COST, "6"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/srv/school.db"));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, Some(dir));
        assert_eq!(config.password_cost, 6);
    }

    #[test]
    fn out_of_range_cost_and_relative_log_dir_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_PASSWORD_COST, "3")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_PASSWORD_COST, .. }));

        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs/dev")])).unwrap_err();
        assert_eq!(err, ConfigError::RelativeLogDir("logs/dev".to_string()));
    }
}
