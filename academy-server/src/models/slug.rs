//! Slug validation for courses and learning paths
//!
//! Slug format: lowercase alphanumeric with hyphens

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for slugs
const MAX_SLUG_LEN: usize = 80;

/// Matches DB constraint: ^[a-z0-9][a-z0-9-]{0,79}$
static SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]{0,79}$").expect("invalid slug regex")
});

/// Validated URL slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    /// Create a new slug, validating format.
    ///
    /// # Example
    /// ```
    /// use academy_server::models::Slug;
    ///
    /// assert!(Slug::new("intro-to-rust").is_ok());
    /// assert!(Slug::new("Intro").is_err());
    /// assert!(Slug::new("-intro").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "slug" });
        }

        if s.len() > MAX_SLUG_LEN {
            return Err(ValidationError::TooLong {
                field: "slug",
                max: MAX_SLUG_LEN,
            });
        }

        if !SLUG_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "slug",
                reason: "must be lowercase alphanumeric with hyphens, starting with alphanumeric",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        assert!(Slug::new("rust-101").is_ok());
        assert!(Slug::new("a").is_ok());
        assert!(Slug::new("2024-bootcamp").is_ok());
    }

    #[test]
    fn rejects_bad_format() {
        for bad in ["Rust", "rust_101", "rust 101", "-rust"] {
            assert!(matches!(
                Slug::new(bad).unwrap_err(),
                ValidationError::InvalidFormat { .. }
            ));
        }
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Slug::new("").unwrap_err(), ValidationError::Empty { .. }));
    }

    #[test]
    fn max_length() {
        assert!(Slug::new(&"a".repeat(80)).is_ok());
        let err = Slug::new(&"a".repeat(81)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 80, .. }));
    }
}
