//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use super::auth::{bearer_token, Claims};
use super::error::ApiError;
use super::server::AppState;
use crate::db::repos::{User, UserRepo};
use crate::models::ValidationError;

/// Authenticated caller, upserted into `users` on every request
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Instructors and admins may create courses.
    pub fn require_author(&self) -> Result<(), ApiError> {
        if self.0.role.can_author() {
            Ok(())
        } else {
            Err(ApiError::forbidden("not_instructor", "instructor role required"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.role.can_administer() {
            Ok(())
        } else {
            Err(ApiError::forbidden("not_admin", "admin role required"))
        }
    }

    /// Admins, or the instructor who owns the course.
    pub fn require_manager(&self, instructor_id: Option<Uuid>) -> Result<(), ApiError> {
        if self.0.role.can_manage_course(self.0.id, instructor_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "not_course_manager",
                "only the course instructor or an admin may do this",
            ))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let claims = claims(parts, state)?.ok_or(ApiError::Unauthorized {
            reason: "missing bearer token",
        })?;
        let user = load_user(state, &claims).await?;
        Ok(Self(user))
    }
}

/// Caller when a valid token is present. A present but invalid token is
/// still rejected.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match claims(parts, state)? {
            Some(claims) => Ok(Self(Some(load_user(state, &claims).await?))),
            None => Ok(Self(None)),
        }
    }
}

fn claims(parts: &Parts, state: &AppState) -> Result<Option<Claims>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or(ApiError::Unauthorized {
            reason: "expected 'Authorization: Bearer <token>'",
        })?;

    state.jwt.verify(token).map(Some).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        ApiError::Unauthorized { reason: e.as_str() }
    })
}

async fn load_user(state: &AppState, claims: &Claims) -> Result<User, ApiError> {
    Ok(UserRepo::new(&state.pool)
        .ensure(claims.sub, &claims.email, claims.name.as_deref())
        .await?)
}

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "invalid UUID format",
            })
        })?;

        Ok(Self(uuid))
    }
}
