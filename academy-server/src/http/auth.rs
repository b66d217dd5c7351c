//! Bearer token handling
//!
//! Tokens are HS256 JWTs minted by the identity provider. Only the subject,
//! email and display name are read from them; roles come from the database.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    pub fn new(sub: Uuid, email: impl Into<String>, name: Option<String>, ttl_seconds: u64) -> Self {
        Self {
            sub,
            email: email.into(),
            name,
            exp: unix_now() + ttl_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
    #[error("could not sign token")]
    Signing,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "token expired",
            Self::BadSignature => "invalid signature",
            Self::Malformed => "malformed token",
            Self::Signing => "could not sign token",
        }
    }
}

/// Signing and verification keys for one shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }

    /// Mint a token, used by `academy token` for local testing.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|_| TokenError::Signing)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length-123456";

    #[test]
    fn sign_then_verify() {
        let keys = JwtKeys::new(SECRET, 0);
        let claims = Claims::new(Uuid::new_v4(), "ada@example.com", Some("Ada".into()), 600);
        let token = keys.sign(&claims).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), "ada@example.com", None, 600);
        let token = JwtKeys::new(SECRET, 0).sign(&claims).unwrap();
        let err = JwtKeys::new("another-secret-entirely-0000000000", 0)
            .verify(&token)
            .unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new(SECRET, 0);
        let claims = Claims {
            exp: unix_now() - 120,
            ..Claims::new(Uuid::new_v4(), "ada@example.com", None, 0)
        };
        let token = keys.sign(&claims).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = JwtKeys::new(SECRET, 0);
        assert_eq!(keys.verify("not-a-jwt").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
