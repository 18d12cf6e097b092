//! SQL identifier validation.
//!
//! Table and column names are interpolated into generated SQL, so every name
//! that reaches a builder is checked once at registration time.
//!
//! - Parts must match `[A-Za-z_][A-Za-z0-9_]*`
//! - Parts may be joined with `.` (`main.users`)

use crate::error::{OrmError, OrmResult};

/// Check that `s` is a plain (optionally dotted) SQL identifier.
pub fn validate_ident(s: &str) -> OrmResult<()> {
    if s.is_empty() {
        return Err(OrmError::configuration("Identifier cannot be empty"));
    }

    for part in s.split('.') {
        let mut chars = part.chars();
        match chars.next() {
            None => {
                return Err(OrmError::configuration(format!(
                    "Empty identifier segment in '{s}'"
                )));
            }
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            Some(c) => {
                return Err(OrmError::configuration(format!(
                    "Invalid identifier start character '{c}' in '{s}'"
                )));
            }
        }
        if let Some(c) = chars.find(|c| !(*c == '_' || c.is_ascii_alphanumeric())) {
            return Err(OrmError::configuration(format!(
                "Invalid character '{c}' in identifier '{s}'"
            )));
        }
    }

    Ok(())
}

/// Boolean form of [`validate_ident`].
pub fn is_valid_ident(s: &str) -> bool {
    validate_ident(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        assert!(is_valid_ident("users"));
        assert!(is_valid_ident("_private"));
        assert!(is_valid_ident("todo_item2"));
    }

    #[test]
    fn ident_dotted() {
        assert!(is_valid_ident("main.users"));
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(!is_valid_ident(""));
    }

    #[test]
    fn ident_rejects_start_digit() {
        assert!(!is_valid_ident("1table"));
    }

    #[test]
    fn ident_rejects_injection() {
        assert!(!is_valid_ident("users; DROP TABLE users"));
        assert!(!is_valid_ident("name--"));
    }

    #[test]
    fn ident_rejects_double_dot() {
        assert!(!is_valid_ident("main..users"));
        assert!(!is_valid_ident("main."));
    }

    #[test]
    fn ident_error_is_configuration() {
        let err = validate_ident("my table").unwrap_err();
        assert!(err.is_configuration_error());
    }
}
