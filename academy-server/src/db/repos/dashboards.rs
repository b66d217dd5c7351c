//! Aggregates for instructor and admin dashboards

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{count_u32, DbError};

/// Per-course figures for the owning instructor
#[derive(Debug, Clone, Serialize)]
pub struct CourseDashboard {
    pub course_id: Uuid,
    pub enrollments: u32,
    pub completions: u32,
    /// Completions as a whole percentage of enrollments
    pub completion_rate: u8,
    pub average_progress: f64,
    pub average_quiz_score: Option<f64>,
    pub quiz_attempts: u32,
    pub certificates_issued: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
    pub users: u32,
    pub instructors: u32,
    pub courses: u32,
    pub published_courses: u32,
    pub enrollments: u32,
    pub certificates: u32,
    pub total_xp: i64,
}

pub struct DashboardRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn course(&self, course_id: Uuid) -> Result<CourseDashboard, DbError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM course_enrollments WHERE course_id = $1) AS enrollments,
                (SELECT COUNT(*) FROM course_enrollments
                 WHERE course_id = $1 AND completed_at IS NOT NULL) AS completions,
                (SELECT COALESCE(AVG(progress_percent), 0)::FLOAT8
                 FROM course_enrollments WHERE course_id = $1) AS average_progress,
                (SELECT AVG(a.score)::FLOAT8 FROM quiz_attempts a
                 JOIN lessons l ON l.id = a.lesson_id
                 JOIN course_modules m ON m.id = l.module_id
                 WHERE m.course_id = $1) AS average_quiz_score,
                (SELECT COUNT(*) FROM quiz_attempts a
                 JOIN lessons l ON l.id = a.lesson_id
                 JOIN course_modules m ON m.id = l.module_id
                 WHERE m.course_id = $1) AS quiz_attempts,
                (SELECT COUNT(*) FROM certificates WHERE course_id = $1) AS certificates_issued
            "#,
        )
        .bind(course_id)
        .fetch_one(self.pool)
        .await?;

        let enrollments = count_u32(row.try_get("enrollments")?);
        let completions = count_u32(row.try_get("completions")?);

        Ok(CourseDashboard {
            course_id,
            enrollments,
            completions,
            completion_rate: completion_rate(completions, enrollments),
            average_progress: round2(row.try_get("average_progress")?),
            average_quiz_score: row.try_get::<Option<f64>, _>("average_quiz_score")?.map(round2),
            quiz_attempts: count_u32(row.try_get("quiz_attempts")?),
            certificates_issued: count_u32(row.try_get("certificates_issued")?),
        })
    }

    pub async fn platform(&self) -> Result<PlatformStats, DbError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE role = 'instructor') AS instructors,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM courses WHERE published) AS published_courses,
                (SELECT COUNT(*) FROM course_enrollments) AS enrollments,
                (SELECT COUNT(*) FROM certificates) AS certificates,
                (SELECT COALESCE(SUM(total_xp), 0)::BIGINT FROM user_gamification_stats) AS total_xp
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(PlatformStats {
            users: count_u32(row.try_get("users")?),
            instructors: count_u32(row.try_get("instructors")?),
            courses: count_u32(row.try_get("courses")?),
            published_courses: count_u32(row.try_get("published_courses")?),
            enrollments: count_u32(row.try_get("enrollments")?),
            certificates: count_u32(row.try_get("certificates")?),
            total_xp: row.try_get("total_xp")?,
        })
    }
}

fn completion_rate(completions: u32, enrollments: u32) -> u8 {
    if enrollments == 0 {
        return 0;
    }
    ((completions as u64 * 100) / enrollments as u64).min(100) as u8
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_handles_empty_course() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn averages_round_to_two_places() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
