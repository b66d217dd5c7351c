//! Quiz questions and attempts

use std::collections::HashMap;

use academy_core::{Answer, Question, QuestionKind, QuizScore};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{count_u32, DbError};

/// Attempt history for one user on one lesson
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptSummary {
    pub attempts_used: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub passed_before: bool,
    pub perfect_before: bool,
    pub best_score: Option<i32>,
}

pub struct QuizRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> QuizRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn questions(&self, lesson_id: Uuid) -> Result<Vec<Question>, DbError> {
        load_questions(self.pool, lesson_id).await
    }

    /// Append a validated question to the lesson's quiz.
    pub async fn add_question(
        &self,
        lesson_id: Uuid,
        prompt: &str,
        points: u32,
        kind: QuestionKind,
    ) -> Result<Question, DbError> {
        let mut question = Question {
            id: Uuid::nil(),
            prompt: prompt.trim().to_owned(),
            points,
            kind,
        };
        question.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO quiz_questions (lesson_id, prompt, position, points, kind)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1, $3, $4
            FROM quiz_questions WHERE lesson_id = $1
            RETURNING id
            "#,
        )
        .bind(lesson_id)
        .bind(&question.prompt)
        .bind(question.points as i32)
        .bind(Json(&question.kind))
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "question",
                    reason: "was appended concurrently, retry".to_string(),
                }
            } else {
                e.into()
            }
        })?;

        question.id = row.try_get("id")?;
        tracing::debug!(lesson_id = %lesson_id, question_id = %question.id, "question added");
        Ok(question)
    }

    pub async fn attempt_summary(&self, user_id: Uuid, lesson_id: Uuid) -> Result<AttemptSummary, DbError> {
        attempt_summary(self.pool, user_id, lesson_id).await
    }
}

pub(crate) async fn load_questions<'c, E: PgExecutor<'c>>(
    exec: E,
    lesson_id: Uuid,
) -> Result<Vec<Question>, DbError> {
    let rows = sqlx::query(
        r#"
        SELECT id, prompt, points, kind
        FROM quiz_questions
        WHERE lesson_id = $1
        ORDER BY position
        "#,
    )
    .bind(lesson_id)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|row| {
            let Json(kind): Json<QuestionKind> = row.try_get("kind")?;
            let points: i32 = row.try_get("points")?;
            Ok(Question {
                id: row.try_get("id")?,
                prompt: row.try_get("prompt")?,
                points: points.max(0) as u32,
                kind,
            })
        })
        .collect()
}

pub(crate) async fn attempt_summary<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    lesson_id: Uuid,
) -> Result<AttemptSummary, DbError> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS attempts,
            MAX(submitted_at) AS last_attempt_at,
            COALESCE(BOOL_OR(passed), FALSE) AS passed_before,
            COALESCE(BOOL_OR(perfect), FALSE) AS perfect_before,
            MAX(score) AS best_score
        FROM quiz_attempts
        WHERE user_id = $1 AND lesson_id = $2
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_one(exec)
    .await?;

    Ok(AttemptSummary {
        attempts_used: count_u32(row.try_get("attempts")?),
        last_attempt_at: row.try_get("last_attempt_at")?,
        passed_before: row.try_get("passed_before")?,
        perfect_before: row.try_get("perfect_before")?,
        best_score: row.try_get("best_score")?,
    })
}

pub(crate) async fn record_attempt<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    lesson_id: Uuid,
    score: &QuizScore,
    answers: &HashMap<Uuid, Answer>,
    now: DateTime<Utc>,
) -> Result<Uuid, DbError> {
    let row = sqlx::query(
        r#"
        INSERT INTO quiz_attempts (user_id, lesson_id, score, passed, perfect, answers, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(score.percent as i32)
    .bind(score.passed)
    .bind(score.perfect)
    .bind(Json(answers))
    .bind(now)
    .fetch_one(exec)
    .await?;

    Ok(row.try_get("id")?)
}
