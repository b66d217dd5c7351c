//! Quiz endpoints
//!
//! Learners never see answer keys: questions are projected to prompt,
//! kind and options before leaving the server.

use std::collections::HashMap;
use std::sync::Arc;

use academy_core::{Answer, Question};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lessons::readable_lesson;
use crate::db::repos::{ProgressionRepo, QuizRepo, QuizSubmission};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidUuid};
use crate::http::server::AppState;

/// Question as shown to a learner
#[derive(Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub prompt: String,
    pub points: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt.clone(),
            points: q.points,
            kind: q.kind.name(),
            options: q.kind.options().map(<[String]>::to_vec),
        }
    }
}

#[derive(Serialize)]
pub struct QuizResponse {
    pub lesson_id: Uuid,
    pub passing_score: u8,
    pub max_attempts: Option<u32>,
    pub retry_cooldown_minutes: u32,
    pub attempts_used: u32,
    pub attempts_remaining: Option<u32>,
    pub passed: bool,
    pub best_score: Option<i32>,
    pub questions: Vec<QuestionView>,
}

/// Quiz submission body: answers keyed by question id
#[derive(Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<Uuid, Answer>,
}

/// GET /lessons/{id}/quiz - questions without answers, plus the caller's attempts
async fn get_quiz(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(lesson_id): ValidUuid,
) -> Result<Json<QuizResponse>, ApiError> {
    let (lesson, _) = readable_lesson(&state, &user, lesson_id).await?;

    let repo = QuizRepo::new(&state.pool);
    let questions = repo.questions(lesson_id).await?;
    if questions.is_empty() {
        return Err(ApiError::not_found("quiz", lesson_id));
    }
    let summary = repo.attempt_summary(user.id(), lesson_id).await?;
    let policy = ProgressionRepo::new(&state.pool, &state.config).policy_for(&lesson);

    Ok(Json(QuizResponse {
        lesson_id,
        passing_score: policy.passing_score,
        max_attempts: policy.max_attempts,
        retry_cooldown_minutes: policy.retry_cooldown_minutes,
        attempts_used: summary.attempts_used,
        attempts_remaining: policy
            .max_attempts
            .map(|max| max.saturating_sub(summary.attempts_used)),
        passed: summary.passed_before,
        best_score: summary.best_score,
        questions: questions.iter().map(QuestionView::from).collect(),
    }))
}

/// POST /lessons/{id}/quiz/attempts - score an attempt
async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidUuid(lesson_id): ValidUuid,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<(StatusCode, Json<QuizSubmission>), ApiError> {
    let submission = ProgressionRepo::new(&state.pool, &state.config)
        .submit_quiz(user.id(), lesson_id, &req.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Quiz routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lessons/{id}/quiz", get(get_quiz))
        .route("/lessons/{id}/quiz/attempts", post(submit_attempt))
}
