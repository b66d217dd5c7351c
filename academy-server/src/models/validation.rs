//! Validation error types

use std::fmt;

use academy_core::AcademyError;

/// Validation error for request models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., slug)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Value outside the allowed range
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Domain rule rejected the input (question shape, answer shape, role name)
    Rule(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::Rule(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<AcademyError> for ValidationError {
    fn from(e: AcademyError) -> Self {
        Self::Rule(e.to_string())
    }
}

/// Reject values outside `min..=max`.
pub fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 200,
        };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 200 characters"
        );

        let err = ValidationError::OutOfRange {
            field: "passing_score",
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "passing_score must be between 0 and 100");
    }

    #[test]
    fn range_check() {
        assert!(check_range("points", 1, 1, 100).is_ok());
        assert!(check_range("points", 0, 1, 100).is_err());
        assert!(check_range("points", 101, 1, 100).is_err());
    }

    #[test]
    fn wraps_domain_errors() {
        let err: ValidationError = AcademyError::EmptyQuiz.into();
        assert_eq!(err.to_string(), "quiz has no questions");
    }
}
