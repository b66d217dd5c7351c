//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.
//! Every body carries `error` (machine code) and `message`; refusals add
//! a `reason` code and sometimes `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use academy_core::Eligibility;

use crate::db::repos::DbError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Missing or invalid bearer token (401)
    Unauthorized { reason: &'static str },

    /// Authenticated but not permitted (403)
    Forbidden {
        reason: &'static str,
        message: String,
        details: Option<Value>,
    },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Uniqueness rule violated (409)
    Conflict { resource: &'static str, reason: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    pub fn forbidden(reason: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            reason,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    fn ineligible(eligibility: Eligibility) -> Self {
        let message = match eligibility {
            Eligibility::NotEnrolled => "enroll in the course before taking this quiz".to_string(),
            Eligibility::LessonLocked => "complete the previous lesson first".to_string(),
            Eligibility::AttemptsExhausted { max } => {
                format!("all {} attempts for this quiz have been used", max)
            }
            Eligibility::CoolingDown { retry_at } => {
                format!("next attempt allowed at {}", retry_at.to_rfc3339())
            }
            Eligibility::Eligible => "attempt allowed".to_string(),
        };
        Self::Forbidden {
            reason: eligibility.reason_code(),
            message,
            details: serde_json::to_value(eligibility).ok(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                }),
            ),
            Self::Unauthorized { reason } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "unauthorized",
                    "message": reason
                }),
            ),
            Self::Forbidden {
                reason,
                message,
                details,
            } => {
                let mut body = json!({
                    "error": "forbidden",
                    "reason": reason,
                    "message": message
                });
                if let Some(details) = details {
                    body["details"] = details.clone();
                }
                (StatusCode::FORBIDDEN, body)
            }
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} '{}' not found", resource, id)
                }),
            ),
            Self::Conflict { resource, reason } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "conflict",
                    "message": format!("{}: {}", resource, reason)
                }),
            ),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { resource, reason } => Self::Conflict { resource, reason },
            DbError::NotAllowed { reason } => Self::Forbidden {
                reason,
                message: match reason {
                    "not_enrolled" => "enroll in the course first".to_string(),
                    "lesson_locked" => "complete the previous lesson first".to_string(),
                    other => other.replace('_', " "),
                },
                details: None,
            },
            DbError::Ineligible(eligibility) => Self::ineligible(eligibility),
            DbError::Rule(rule) => Self::Validation(rule.into()),
            _ => Self::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::AcademyError;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Empty { field: "title" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let err = ApiError::Unauthorized {
            reason: "missing bearer token",
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err = ApiError::not_found("course", "abc");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn double_enrollment_is_409() {
        let err: ApiError = DbError::Conflict {
            resource: "enrollment",
            reason: "already enrolled in this course".into(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn exhausted_attempts_carry_reason_code() {
        let err: ApiError = DbError::Ineligible(Eligibility::AttemptsExhausted { max: 3 }).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["reason"], "attempts_exhausted");
        assert_eq!(body["details"]["max"], 3);
    }

    #[tokio::test]
    async fn locked_lesson_is_403() {
        let err: ApiError = DbError::NotAllowed {
            reason: "lesson_locked",
        }
        .into();
        let body = body_json(err.into_response()).await;
        assert_eq!(body["reason"], "lesson_locked");
    }

    #[tokio::test]
    async fn domain_rule_is_400() {
        let err: ApiError = DbError::Rule(AcademyError::EmptyQuiz).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn database_error_hides_details() {
        let err: ApiError = DbError::Corrupt("users.role = 'x'".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "an internal error occurred");
    }
}
