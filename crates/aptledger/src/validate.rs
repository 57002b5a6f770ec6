//! Field validators for user input.
//!
//! Each validator returns `Ok(())` or an [`Error::Validation`] naming the
//! field, so ledger operations can chain them with `?`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

const USERNAME_PATTERN: &str = r"^[a-zA-Z0-9_]+$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^[\d\s\-\+\(\)]+$";

/// A lazily compiled, built-in field pattern.
#[derive(Debug)]
struct FieldPattern {
    source: &'static str,
    message: &'static str,
    compiled: OnceLock<Regex>,
}

impl FieldPattern {
    const fn new(source: &'static str, message: &'static str) -> Self {
        Self {
            source,
            message,
            compiled: OnceLock::new(),
        }
    }

    /// # Panics
    ///
    /// Panics if the built-in pattern is invalid.
    fn regex(&self) -> &Regex {
        self.compiled
            .get_or_init(|| Regex::new(self.source).expect("Invalid built-in field pattern"))
    }

    fn check(&self, field: &str, value: &str) -> Result<()> {
        if self.regex().is_match(value) {
            Ok(())
        } else {
            Err(Error::validation(field, self.message))
        }
    }
}

static USERNAME: FieldPattern = FieldPattern::new(
    USERNAME_PATTERN,
    "can only contain letters, numbers, and underscores",
);
static EMAIL: FieldPattern = FieldPattern::new(EMAIL_PATTERN, "not a valid email address");
static PHONE: FieldPattern = FieldPattern::new(PHONE_PATTERN, "not a valid phone number");

/// Reject blank values.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `value` is empty or whitespace.
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "this field is required"));
    }
    Ok(())
}

/// Check a login name.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the name is blank or has characters
/// other than ASCII letters, digits and `_`.
pub fn username(value: &str) -> Result<()> {
    required("username", value)?;
    USERNAME.check("username", value)
}

/// Check an email address.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the address is malformed.
pub fn email(value: &str) -> Result<()> {
    EMAIL.check("email", value)
}

/// Check an optional email address; blank is accepted.
///
/// # Errors
///
/// Returns [`Error::Validation`] if a non-blank address is malformed.
pub fn optional_email(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Ok(());
    }
    email(value)
}

/// Check an optional phone number; blank is accepted.
///
/// # Errors
///
/// Returns [`Error::Validation`] if a non-blank number has characters other
/// than digits, spaces and `-+()`.
pub fn phone(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    PHONE.check("phone", value)
}

/// Check that an amount is finite and greater than zero.
///
/// # Errors
///
/// Returns [`Error::Validation`] otherwise.
pub fn positive_amount(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::validation(field, "must be a positive number"))
    }
}

/// Check that a quantity is at least one.
///
/// # Errors
///
/// Returns [`Error::Validation`] for zero.
pub fn positive_quantity(value: u32) -> Result<()> {
    if value == 0 {
        return Err(Error::validation("quantity", "must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("name", "x").is_ok());
        let err = required("name", "  ").unwrap_err();
        assert_eq!(err.to_string(), "invalid name: this field is required");
    }

    #[test]
    fn test_username() {
        assert!(username("flat_12").is_ok());
        assert!(username("ABC123").is_ok());
        assert!(username("").is_err());
        assert!(username("with space").is_err());
        assert!(username("dash-name").is_err());
        assert!(username("émile").is_err());
    }

    #[test]
    fn test_email() {
        assert!(email("a@b.co").is_ok());
        assert!(email("a@b").is_err());
        assert!(email("a b@c.d").is_err());
        assert!(email("").is_err());
        assert!(optional_email("").is_ok());
        assert!(optional_email("nope").is_err());
    }

    #[test]
    fn test_phone() {
        assert!(phone("").is_ok());
        assert!(phone("+966 (11) 555-0101").is_ok());
        assert!(phone("call me").is_err());
    }

    #[test]
    fn test_positive_amount() {
        assert!(positive_amount("unit_price", 0.5).is_ok());
        assert!(positive_amount("unit_price", 0.0).is_err());
        assert!(positive_amount("unit_price", -3.0).is_err());
        assert!(positive_amount("unit_price", f64::NAN).is_err());
        assert!(positive_amount("unit_price", f64::INFINITY).is_err());
    }

    #[test]
    fn test_positive_quantity() {
        assert!(positive_quantity(1).is_ok());
        assert!(positive_quantity(0).is_err());
    }
}
