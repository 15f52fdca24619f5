//! Input normalization shared by coordinator operations.
//!
//! # Invariants
//! - Emails are compared trimmed and lowercased.
//! - Subject codes are trimmed and must match `SUBJECT_CODE_RE`.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static SUBJECT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid subject code regex"));

/// Returns the lowercase trimmed email, or `None` when it is not email-shaped.
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    EMAIL_RE.is_match(&normalized).then_some(normalized)
}

pub fn normalize_subject_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    SUBJECT_CODE_RE
        .is_match(trimmed)
        .then(|| trimmed.to_string())
}

/// Trims a display name; blank names are rejected.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, normalize_name, normalize_subject_code};

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Ada.Lovelace@School.TEST ").as_deref(),
            Some("ada.lovelace@school.test")
        );
        assert_eq!(normalize_email("no-at-sign"), None);
        assert_eq!(normalize_email("two@@school.test"), None);
    }

    #[test]
    fn subject_code_rejects_spaces_and_leading_symbols() {
        assert_eq!(normalize_subject_code(" MATH-101 ").as_deref(), Some("MATH-101"));
        assert_eq!(normalize_subject_code("MATH 101"), None);
        assert_eq!(normalize_subject_code("-x"), None);
        assert_eq!(normalize_subject_code(""), None);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(normalize_name("  \t"), None);
        assert_eq!(normalize_name(" Physics ").as_deref(), Some("Physics"));
    }
}
