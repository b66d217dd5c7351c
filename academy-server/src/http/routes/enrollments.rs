//! Enrollment and course progress endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::courses::visible_course;
use crate::db::repos::{CourseRepo, Enrollment, EnrollmentRepo, ProgressReport, ProgressionRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidUuid};
use crate::http::server::AppState;

/// Enrollment response
#[derive(Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub progress_percent: i32,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            course_id: e.course_id,
            progress_percent: e.progress_percent,
            enrolled_at: e.enrolled_at.to_rfc3339(),
            completed_at: e.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// POST /courses/{id}/enroll - enroll the caller (409 when already enrolled)
async fn enroll(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    visible_course(&CourseRepo::new(&state.pool), course_id, Some(&user.0)).await?;
    let enrollment = EnrollmentRepo::new(&state.pool).enroll(user.id(), course_id).await?;

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(enrollment))))
}

/// DELETE /courses/{id}/enroll - leave a course, keeping progress and certificates
async fn unenroll(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    let removed = EnrollmentRepo::new(&state.pool).unenroll(user.id(), course_id).await?;
    if !removed {
        return Err(ApiError::not_found("enrollment", course_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /courses/{id}/progress - the caller's progress through a course
async fn progress(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
) -> Result<Json<ProgressReport>, ApiError> {
    visible_course(&CourseRepo::new(&state.pool), course_id, Some(&user.0)).await?;
    let report = ProgressionRepo::new(&state.pool, &state.config)
        .course_progress(user.id(), course_id)
        .await?;
    Ok(Json(report))
}

/// Enrollment routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses/{id}/enroll", post(enroll).delete(unenroll))
        .route("/courses/{id}/progress", get(progress))
}
