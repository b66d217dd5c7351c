//! Lesson content and completion

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::repos::{CourseRepo, Lesson, LessonAccess, LessonCompletion, ProgressionRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidUuid};
use crate::http::server::AppState;

/// Lesson with the caller's state
#[derive(Serialize)]
pub struct LessonResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content: String,
    pub position: i32,
    pub is_preview: bool,
    pub has_quiz: bool,
    pub enrolled: bool,
    pub unlocked: bool,
    pub completed: bool,
}

impl LessonResponse {
    fn new(lesson: Lesson, access: LessonAccess) -> Self {
        Self {
            id: lesson.id,
            course_id: lesson.course_id,
            module_id: lesson.module_id,
            title: lesson.title,
            content: lesson.content,
            position: lesson.position,
            is_preview: lesson.is_preview,
            has_quiz: lesson.question_count > 0,
            enrolled: access.enrolled,
            unlocked: access.unlocked,
            completed: access.completed,
        }
    }
}

/// Load a lesson and check the caller may read it.
///
/// Managers see everything. Others need a published course and either a
/// preview lesson or an enrollment with the lesson unlocked.
pub(crate) async fn readable_lesson(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> Result<(Lesson, LessonAccess), ApiError> {
    let lesson = CourseRepo::new(&state.pool).lesson(id).await?;
    let manager = user.0.role.can_manage_course(user.id(), lesson.instructor_id);
    if !lesson.published && !manager {
        return Err(ApiError::not_found("lesson", id));
    }

    let access = ProgressionRepo::new(&state.pool, &state.config)
        .lesson_access(user.id(), &lesson)
        .await?;
    if manager || access.can_view(&lesson) {
        return Ok((lesson, access));
    }

    if !access.enrolled {
        Err(ApiError::forbidden("not_enrolled", "enroll in the course to view this lesson"))
    } else {
        Err(ApiError::forbidden("lesson_locked", "complete the previous lesson first"))
    }
}

/// GET /lessons/{id} - lesson content
async fn get_lesson(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<LessonResponse>, ApiError> {
    let (lesson, access) = readable_lesson(&state, &user, id).await?;
    Ok(Json(LessonResponse::new(lesson, access)))
}

/// POST /lessons/{id}/complete - mark complete and apply progress, XP,
/// certificate, path, streak and badge updates
async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<LessonCompletion>, ApiError> {
    let completion = ProgressionRepo::new(&state.pool, &state.config)
        .complete_lesson(user.id(), id)
        .await?;
    Ok(Json(completion))
}

/// Lesson routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lessons/{id}", get(get_lesson))
        .route("/lessons/{id}/complete", post(complete_lesson))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::test_support::{app, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn complete_requires_token() {
        let uri = format!("/lessons/{}/complete", Uuid::new_v4());
        let (status, _) = send(app(), Request::post(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let token = crate::http::routes::test_support::token();
        let tampered = format!("{}x", token);
        let request = Request::get(format!("/lessons/{}", Uuid::new_v4()))
            .header("authorization", format!("Bearer {}", tampered))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
