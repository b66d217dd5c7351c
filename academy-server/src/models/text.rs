//! Free-text fields: titles and bodies

use super::ValidationError;

const MAX_TITLE_LEN: usize = 200;
const MAX_BODY_LEN: usize = 100_000;

/// Validated title for courses, modules, lessons and paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title(String);

impl Title {
    /// Trimmed, non-empty, at most 200 characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if trimmed.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lesson content or course description. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body(String);

impl Body {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.len() > MAX_BODY_LEN {
            return Err(ValidationError::TooLong {
                field: "content",
                max: MAX_BODY_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn optional(s: Option<&str>) -> Result<Self, ValidationError> {
        s.map(Self::new).transpose().map(Option::unwrap_or_default)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
