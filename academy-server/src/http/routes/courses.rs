//! Course catalog endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repos::{Course, CourseRepo, CourseWithCount, ModuleOutline, NewCourse};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, MaybeUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::{Body, Paginated, Pagination, PaginationParams, Slug, Title};

/// Create course request
#[derive(Deserialize)]
pub struct CreateCourseRequest {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_sequential")]
    pub sequential: bool,
}

fn default_sequential() -> bool {
    true
}

/// Course response
#[derive(Serialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub instructor_id: Option<Uuid>,
    pub published: bool,
    pub sequential: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_count: Option<i64>,
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            slug: c.slug,
            title: c.title,
            description: c.description,
            instructor_id: c.instructor_id,
            published: c.published,
            sequential: c.sequential,
            created_at: c.created_at.to_rfc3339(),
            lesson_count: None,
        }
    }
}

impl From<CourseWithCount> for CourseResponse {
    fn from(c: CourseWithCount) -> Self {
        Self {
            lesson_count: Some(c.lesson_count),
            ..Self::from(c.course)
        }
    }
}

#[derive(Serialize)]
pub struct LessonOutlineResponse {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub is_preview: bool,
    pub has_quiz: bool,
}

#[derive(Serialize)]
pub struct ModuleResponse {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub lessons: Vec<LessonOutlineResponse>,
}

impl From<ModuleOutline> for ModuleResponse {
    fn from(o: ModuleOutline) -> Self {
        Self {
            id: o.module.id,
            title: o.module.title,
            position: o.module.position,
            lessons: o
                .lessons
                .into_iter()
                .map(|l| LessonOutlineResponse {
                    id: l.id,
                    title: l.title,
                    position: l.position,
                    is_preview: l.is_preview,
                    has_quiz: l.has_quiz,
                })
                .collect(),
        }
    }
}

/// Course with its outline
#[derive(Serialize)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub modules: Vec<ModuleResponse>,
}

/// GET /courses - list published courses with pagination
async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<CourseResponse>>, ApiError> {
    let page = Pagination::from(params);
    let result = CourseRepo::new(&state.pool).list_published(page).await?;
    Ok(Json(result.map(CourseResponse::from)))
}

/// POST /courses - create a draft course owned by the caller
async fn create_course(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    user.require_author()?;

    let new = NewCourse {
        slug: Slug::new(&req.slug)?,
        title: Title::new(&req.title)?,
        description: Body::optional(req.description.as_deref())?,
        instructor_id: user.id(),
        sequential: req.sequential,
    };
    let course = CourseRepo::new(&state.pool).create(new).await?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

/// GET /courses/{id} - course with ordered modules and lessons
///
/// Drafts are only visible to the people who may manage them.
async fn get_course(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let repo = CourseRepo::new(&state.pool);
    let course = visible_course(&repo, id, user.as_ref()).await?;
    let outline = repo.outline(id).await?;

    Ok(Json(CourseDetailResponse {
        course: CourseResponse::from(course),
        modules: outline.into_iter().map(ModuleResponse::from).collect(),
    }))
}

/// Load a course, hiding drafts from everyone but its managers.
pub(crate) async fn visible_course(
    repo: &CourseRepo<'_>,
    id: Uuid,
    user: Option<&crate::db::repos::User>,
) -> Result<Course, ApiError> {
    let course = repo.get(id).await?;
    let can_manage = user.is_some_and(|u| u.role.can_manage_course(u.id, course.instructor_id));
    if !course.published && !can_manage {
        return Err(ApiError::not_found("course", id));
    }
    Ok(course)
}

/// Course routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course))
}
