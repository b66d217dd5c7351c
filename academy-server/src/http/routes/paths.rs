//! Learning path endpoints

use std::sync::Arc;

use academy_core::PathProgress;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::repos::{LearningPath, PathDetail, PathRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, MaybeUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Serialize)]
pub struct PathResponse {
    #[serde(flatten)]
    pub path: PathDetail,
    /// Present when the caller is authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<PathProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled: Option<bool>,
}

#[derive(Serialize)]
pub struct PathEnrollmentResponse {
    pub path_id: Uuid,
    pub enrolled_at: String,
}

/// GET /paths - published learning paths
async fn list_paths(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<LearningPath>>, ApiError> {
    let page = Pagination::from(params);
    let paths = PathRepo::new(&state.pool).list_published(page).await?;
    Ok(Json(paths))
}

/// GET /paths/{id} - path with its courses, and caller progress when signed in
async fn get_path(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<PathResponse>, ApiError> {
    let repo = PathRepo::new(&state.pool);
    let detail = repo.get(id).await?;
    let is_admin = user.as_ref().is_some_and(|u| u.role.can_administer());
    if !detail.path.published && !is_admin {
        return Err(ApiError::not_found("learning path", id));
    }

    let (progress, enrolled) = match &user {
        Some(user) => (
            Some(repo.progress(user.id, &detail).await?),
            Some(repo.is_enrolled(user.id, id).await?),
        ),
        None => (None, None),
    };

    Ok(Json(PathResponse {
        path: detail,
        progress,
        enrolled,
    }))
}

/// POST /paths/{id}/enroll - enroll in a path (409 when already enrolled)
async fn enroll(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<(StatusCode, Json<PathEnrollmentResponse>), ApiError> {
    let repo = PathRepo::new(&state.pool);
    let detail = repo.get(id).await?;
    if !detail.path.published {
        return Err(ApiError::not_found("learning path", id));
    }

    let enrolled_at = repo.enroll(user.id(), id).await?;
    Ok((
        StatusCode::CREATED,
        Json(PathEnrollmentResponse {
            path_id: id,
            enrolled_at: enrolled_at.to_rfc3339(),
        }),
    ))
}

/// Learning path routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/paths", get(list_paths))
        .route("/paths/{id}", get(get_path))
        .route("/paths/{id}/enroll", post(enroll))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::test_support::{app, send};
    use axum::body::Body;
    use axum::http::Request;

    #[tokio::test]
    async fn invalid_optional_token_is_still_rejected() {
        let request = Request::get(format!("/paths/{}", Uuid::new_v4()))
            .header("authorization", "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "malformed token");
    }

    #[tokio::test]
    async fn path_enroll_requires_token() {
        let uri = format!("/paths/{}/enroll", Uuid::new_v4());
        let (status, _) = send(app(), Request::post(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
