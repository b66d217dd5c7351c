//! Course enrollment repository
//!
//! - enroll: plain INSERT, the UNIQUE(user_id, course_id) constraint
//!   reports double enrollment
//! - unenroll: removes the enrollment only; lesson progress, attempts and
//!   certificates stay so a re-enrollment resumes where the learner left

use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{is_unique_violation, DbError};

/// Enrollment record from database
#[derive(Debug, Clone, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress_percent: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct EnrollmentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EnrollmentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enroll a user. A second enrollment is a conflict, never a duplicate row.
    ///
    /// Progress already recorded from an earlier enrollment is folded back in.
    pub async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment, DbError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO course_enrollments (user_id, course_id, progress_percent)
            SELECT $1, $2, COALESCE((
                SELECT LEAST(100, (COUNT(p.lesson_id) * 100 / NULLIF(
                    (SELECT COUNT(*) FROM lessons l
                     JOIN course_modules m ON m.id = l.module_id
                     WHERE m.course_id = $2), 0))::INT)
                FROM user_progress p
                WHERE p.user_id = $1 AND p.course_id = $2
            ), 0)
            RETURNING id, user_id, course_id, progress_percent, enrolled_at, completed_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "enrollment",
                    reason: "already enrolled in this course".to_string(),
                }
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id = %user_id, course_id = %course_id, "enrolled");
        Ok(enrollment)
    }

    /// Returns false when there was nothing to remove.
    pub async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            "DELETE FROM course_enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .execute(self.pool)
        .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(user_id = %user_id, course_id = %course_id, "unenrolled");
        }
        Ok(removed)
    }

    pub async fn get(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>, DbError> {
        find(self.pool, user_id, course_id, false).await
    }
}

/// Look up an enrollment, optionally locking it for the rest of the transaction.
pub(crate) async fn find<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    course_id: Uuid,
    for_update: bool,
) -> Result<Option<Enrollment>, DbError> {
    let sql = format!(
        r#"
        SELECT id, user_id, course_id, progress_percent, enrolled_at, completed_at
        FROM course_enrollments
        WHERE user_id = $1 AND course_id = $2
        {}
        "#,
        if for_update { "FOR UPDATE" } else { "" }
    );

    Ok(sqlx::query_as::<_, Enrollment>(&sql)
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(exec)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::fixtures;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn double_enrollment_conflicts() {
        let pool = fixtures::pool().await;
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, None).await;

        let repo = EnrollmentRepo::new(&pool);
        repo.enroll(user.id, fx.course.id).await.expect("first enrollment");
        let err = repo.enroll(user.id, fx.course.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unenroll_twice_reports_nothing_removed() {
        let pool = fixtures::pool().await;
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, None).await;

        let repo = EnrollmentRepo::new(&pool);
        repo.enroll(user.id, fx.course.id).await.expect("enroll");
        assert!(repo.unenroll(user.id, fx.course.id).await.expect("unenroll"));
        assert!(!repo.unenroll(user.id, fx.course.id).await.expect("second unenroll"));
        assert!(repo.get(user.id, fx.course.id).await.expect("get").is_none());
    }
}
