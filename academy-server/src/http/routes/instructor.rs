//! Course authoring and the instructor dashboard
//!
//! Every route here needs the caller to manage the course: an admin, or
//! the instructor who owns it.

use std::sync::Arc;

use academy_core::{Question, QuestionKind};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::courses::CourseResponse;
use crate::db::repos::{CourseDashboard, CourseRepo, DashboardRepo, Lesson, Module, NewLesson, QuizRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::{check_range, Body, Title};

const MAX_ATTEMPTS_CAP: u32 = 100;
const MAX_POINTS: u32 = 1_000;

#[derive(Deserialize)]
pub struct CreateModuleRequest {
    pub title: String,
}

#[derive(Serialize)]
pub struct ModuleCreatedResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

impl From<Module> for ModuleCreatedResponse {
    fn from(m: Module) -> Self {
        Self {
            id: m.id,
            course_id: m.course_id,
            title: m.title,
            position: m.position,
        }
    }
}

/// New lesson; quiz settings fall back to the `[quiz]` config section
#[derive(Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub is_preview: bool,
    pub passing_score: Option<u32>,
    pub max_attempts: Option<u32>,
}

#[derive(Serialize)]
pub struct LessonCreatedResponse {
    pub id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub is_preview: bool,
    pub passing_score: i32,
    pub max_attempts: Option<i32>,
}

impl From<Lesson> for LessonCreatedResponse {
    fn from(l: Lesson) -> Self {
        Self {
            id: l.id,
            module_id: l.module_id,
            course_id: l.course_id,
            title: l.title,
            position: l.position,
            is_preview: l.is_preview,
            passing_score: l.passing_score,
            max_attempts: l.max_attempts,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateQuestionRequest {
    pub prompt: String,
    #[serde(default = "default_points")]
    pub points: u32,
    pub kind: QuestionKind,
}

fn default_points() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

/// POST /courses/{id}/modules - append a module
async fn create_module(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
    Json(req): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ModuleCreatedResponse>), ApiError> {
    let repo = CourseRepo::new(&state.pool);
    let course = repo.get(course_id).await?;
    user.require_manager(course.instructor_id)?;

    let module = repo.add_module(course_id, Title::new(&req.title)?).await?;
    tracing::info!(course_id = %course_id, module_id = %module.id, "module created");
    Ok((StatusCode::CREATED, Json(ModuleCreatedResponse::from(module))))
}

/// POST /modules/{id}/lessons - append a lesson
async fn create_lesson(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(module_id): ValidUuid,
    Json(req): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<LessonCreatedResponse>), ApiError> {
    let repo = CourseRepo::new(&state.pool);
    let course = repo.course_for_module(module_id).await?;
    user.require_manager(course.instructor_id)?;

    let new = new_lesson(req, &state.config.quiz)?;
    let lesson = repo.add_lesson(module_id, new).await?;
    tracing::info!(course_id = %course.id, lesson_id = %lesson.id, "lesson created");
    Ok((StatusCode::CREATED, Json(LessonCreatedResponse::from(lesson))))
}

fn new_lesson(req: CreateLessonRequest, defaults: &academy_core::QuizPolicy) -> Result<NewLesson, ApiError> {
    let passing_score = req.passing_score.unwrap_or(defaults.passing_score as u32);
    check_range("passing_score", passing_score as i64, 0, 100)?;

    let max_attempts = req.max_attempts.or(defaults.max_attempts);
    if let Some(max) = max_attempts {
        check_range("max_attempts", max as i64, 1, MAX_ATTEMPTS_CAP as i64)?;
    }

    Ok(NewLesson {
        title: Title::new(&req.title)?,
        content: Body::optional(req.content.as_deref())?,
        is_preview: req.is_preview,
        passing_score: passing_score as u8,
        max_attempts,
    })
}

/// POST /lessons/{id}/questions - add a quiz question (answer key included)
async fn create_question(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(lesson_id): ValidUuid,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<Question>), ApiError> {
    let lesson = CourseRepo::new(&state.pool).lesson(lesson_id).await?;
    user.require_manager(lesson.instructor_id)?;
    check_range("points", req.points as i64, 1, MAX_POINTS as i64)?;

    let question = QuizRepo::new(&state.pool)
        .add_question(lesson_id, &req.prompt, req.points, req.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// PATCH /courses/{id}/publish - show or hide a course in the catalog
async fn set_published(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
    Json(req): Json<PublishRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let repo = CourseRepo::new(&state.pool);
    let course = repo.get(course_id).await?;
    user.require_manager(course.instructor_id)?;

    let course = repo.set_published(course_id, req.published).await?;
    Ok(Json(CourseResponse::from(course)))
}

/// GET /courses/{id}/dashboard - enrollment and outcome figures
async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(course_id): ValidUuid,
) -> Result<Json<CourseDashboard>, ApiError> {
    let course = CourseRepo::new(&state.pool).get(course_id).await?;
    user.require_manager(course.instructor_id)?;

    let dashboard = DashboardRepo::new(&state.pool).course(course_id).await?;
    Ok(Json(dashboard))
}

/// Instructor routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses/{id}/modules", post(create_module))
        .route("/modules/{id}/lessons", post(create_lesson))
        .route("/lessons/{id}/questions", post(create_question))
        .route("/courses/{id}/publish", patch(set_published))
        .route("/courses/{id}/dashboard", get(dashboard))
}
