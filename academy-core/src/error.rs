/// Structured error types for academy-core.
///
/// The server maps these onto HTTP responses; the CLI wraps them in `anyhow`.
use thiserror::Error;
use uuid::Uuid;

/// Main error type for academy-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcademyError {
    /// A quiz with no questions cannot be scored
    #[error("quiz has no questions")]
    EmptyQuiz,

    /// Submitted answer references a question that is not part of the quiz
    #[error("answer references unknown question {id}")]
    UnknownQuestion { id: Uuid },

    /// Answer shape does not match the question kind
    #[error("answer for question {id} does not match its kind ({expected})")]
    AnswerMismatch { id: Uuid, expected: &'static str },

    /// Question definition failed validation
    #[error("invalid question: {reason}")]
    InvalidQuestion { reason: String },

    /// Unknown role string
    #[error("unknown role '{value}'")]
    UnknownRole { value: String },

    /// Unknown XP source string
    #[error("unknown xp source '{value}'")]
    UnknownXpSource { value: String },

    /// Unknown badge string
    #[error("unknown badge '{value}'")]
    UnknownBadge { value: String },

    /// Configuration error
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for academy-core operations
pub type Result<T> = std::result::Result<T, AcademyError>;

impl AcademyError {
    /// Create an invalid question error
    pub fn invalid_question(reason: impl Into<String>) -> Self {
        Self::InvalidQuestion {
            reason: reason.into(),
        }
    }

    /// Create an unknown role error
    pub fn unknown_role(value: impl Into<String>) -> Self {
        Self::UnknownRole {
            value: value.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AcademyError::invalid_question("needs at least two options");
        assert_eq!(
            err.to_string(),
            "invalid question: needs at least two options"
        );

        let err = AcademyError::unknown_role("owner");
        assert!(err.to_string().contains("owner"));
    }
}
