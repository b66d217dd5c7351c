//! Admin endpoints: roles, platform totals, learning path authoring

use std::sync::Arc;

use academy_core::Role;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repos::{CourseRepo, DashboardRepo, LearningPath, PathDetail, PathRepo, PlatformStats, User, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::{Body, Slug, Title, ValidationError};

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreatePathRequest {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Deserialize)]
pub struct AddPathCourseRequest {
    pub course_id: Uuid,
}

/// PATCH /admin/users/{id}/role - change a user's role
async fn set_role(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    ValidUuid(user_id): ValidUuid,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    admin.require_admin()?;
    let role: Role = req
        .role
        .parse()
        .map_err(|e: academy_core::AcademyError| ValidationError::from(e))?;

    if user_id == admin.id() && role != Role::Admin {
        return Err(ApiError::forbidden("cannot_demote_self", "admins cannot remove their own admin role"));
    }

    let user = UserRepo::new(&state.pool).set_role(user_id, role).await?;
    Ok(Json(UserResponse::from(user)))
}

/// GET /admin/stats - platform totals
async fn platform_stats(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
) -> Result<Json<PlatformStats>, ApiError> {
    admin.require_admin()?;
    let stats = DashboardRepo::new(&state.pool).platform().await?;
    Ok(Json(stats))
}

/// POST /admin/paths - create a learning path
async fn create_path(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    Json(req): Json<CreatePathRequest>,
) -> Result<(StatusCode, Json<LearningPath>), ApiError> {
    admin.require_admin()?;

    let path = PathRepo::new(&state.pool)
        .create(
            Slug::new(&req.slug)?,
            Title::new(&req.title)?,
            Body::optional(req.description.as_deref())?,
            req.published,
        )
        .await?;
    tracing::info!(path_id = %path.id, slug = %path.slug, "learning path created");
    Ok((StatusCode::CREATED, Json(path)))
}

/// POST /admin/paths/{id}/courses - append a course to a path
async fn add_path_course(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    ValidUuid(path_id): ValidUuid,
    Json(req): Json<AddPathCourseRequest>,
) -> Result<(StatusCode, Json<PathDetail>), ApiError> {
    admin.require_admin()?;
    CourseRepo::new(&state.pool).get(req.course_id).await?;

    let detail = PathRepo::new(&state.pool).add_course(path_id, req.course_id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Admin routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users/{id}/role", patch(set_role))
        .route("/admin/stats", get(platform_stats))
        .route("/admin/paths", post(create_path))
        .route("/admin/paths/{id}/courses", post(add_path_course))
}
