//! Validation error types and shared field checks

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Validation error for caller input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is missing or blank
    Empty { field: &'static str },

    /// Numeric field outside its allowed range
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    /// Numeric field is negative
    Negative { field: &'static str },

    /// Numeric filter could not be parsed
    NotNumeric { field: &'static str, value: String },

    /// String doesn't match required format (e.g., email)
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Photo carries neither a url nor inline data
    MissingPhotoSource { index: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} is required", field),
            Self::OutOfRange {
                field,
                min,
                max,
                value,
            } => write!(f, "{} must be between {} and {}, got {}", field, min, max, value),
            Self::Negative { field } => write!(f, "{} cannot be negative", field),
            Self::NotNumeric { field, value } => {
                write!(f, "{} must be numeric, got '{}'", field, value)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::MissingPhotoSource { index } => {
                write!(f, "photo {} has neither a url nor inline data", index + 1)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Reject a missing or whitespace-only value.
pub fn require<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Empty { field }),
    }
}

/// Reject obviously malformed email addresses (`local@domain.tld`).
pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field,
            reason: "not a valid email address",
        })
    }
}

pub fn non_negative<T: PartialOrd + Default>(
    field: &'static str,
    value: Option<T>,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < T::default() => Err(ValidationError::Negative { field }),
        _ => Ok(()),
    }
}
