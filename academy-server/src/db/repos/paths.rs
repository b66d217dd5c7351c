//! Learning paths: ordered course sequences

use std::collections::HashSet;

use academy_core::{PathProgress, XpRules, XpSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::gamification::award_xp;
use super::{is_unique_violation, DbError};
use crate::models::{Body, Paginated, Pagination, Slug, Title};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LearningPath {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PathCourse {
    pub course_id: Uuid,
    pub slug: String,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathDetail {
    #[serde(flatten)]
    pub path: LearningPath,
    pub courses: Vec<PathCourse>,
}

impl PathDetail {
    pub fn course_ids(&self) -> Vec<Uuid> {
        self.courses.iter().map(|c| c.course_id).collect()
    }
}

/// Path completion produced by finishing a course
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PathCompletion {
    pub path_id: Uuid,
    pub xp_awarded: u32,
}

pub struct PathRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PathRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_published(&self, page: Pagination) -> Result<Paginated<LearningPath>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, slug, title, description, published, created_at
            FROM learning_paths
            WHERE published
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learning_paths WHERE published")
            .fetch_one(self.pool)
            .await?;
        let items = rows
            .iter()
            .map(LearningPath::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<PathDetail, DbError> {
        let path = sqlx::query_as::<_, LearningPath>(
            "SELECT id, slug, title, description, published, created_at FROM learning_paths WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("learning path", id))?;

        let courses = path_courses(self.pool, id).await?;
        Ok(PathDetail { path, courses })
    }

    /// Progress of `user_id` through the path, whether or not they enrolled.
    pub async fn progress(&self, user_id: Uuid, detail: &PathDetail) -> Result<PathProgress, DbError> {
        let completed = completed_courses(self.pool, user_id).await?;
        Ok(PathProgress::from_courses(&detail.course_ids(), &completed))
    }

    pub async fn is_enrolled(&self, user_id: Uuid, path_id: Uuid) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM learning_path_enrollments WHERE user_id = $1 AND path_id = $2)",
        )
        .bind(user_id)
        .bind(path_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn enroll(&self, user_id: Uuid, path_id: Uuid) -> Result<DateTime<Utc>, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO learning_path_enrollments (user_id, path_id)
            VALUES ($1, $2)
            RETURNING enrolled_at
            "#,
        )
        .bind(user_id)
        .bind(path_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "path enrollment",
                    reason: "already enrolled in this learning path".to_string(),
                }
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id = %user_id, path_id = %path_id, "enrolled in learning path");
        Ok(row.try_get("enrolled_at")?)
    }

    pub async fn create(
        &self,
        slug: Slug,
        title: Title,
        description: Body,
        published: bool,
    ) -> Result<LearningPath, DbError> {
        sqlx::query_as::<_, LearningPath>(
            r#"
            INSERT INTO learning_paths (slug, title, description, published)
            VALUES ($1, $2, $3, $4)
            RETURNING id, slug, title, description, published, created_at
            "#,
        )
        .bind(slug.as_str())
        .bind(title.as_str())
        .bind(description.as_str())
        .bind(published)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "learning path",
                    reason: format!("slug '{}' already exists", slug.as_str()),
                }
            } else {
                e.into()
            }
        })
    }

    /// Append a course to the end of the path.
    pub async fn add_course(&self, path_id: Uuid, course_id: Uuid) -> Result<PathDetail, DbError> {
        sqlx::query(
            r#"
            INSERT INTO learning_path_courses (path_id, course_id, position)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1
            FROM learning_path_courses WHERE path_id = $1
            "#,
        )
        .bind(path_id)
        .bind(course_id)
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Conflict {
                resource: "learning path",
                reason: "course is already part of this path".to_string(),
            },
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                DbError::not_found("course or learning path", format!("{}/{}", path_id, course_id))
            }
            _ => e.into(),
        })?;

        self.get(path_id).await
    }
}

async fn path_courses<'c, E: PgExecutor<'c>>(exec: E, path_id: Uuid) -> Result<Vec<PathCourse>, DbError> {
    Ok(sqlx::query_as::<_, PathCourse>(
        r#"
        SELECT pc.course_id, c.slug, c.title, pc.position
        FROM learning_path_courses pc
        JOIN courses c ON c.id = pc.course_id
        WHERE pc.path_id = $1
        ORDER BY pc.position
        "#,
    )
    .bind(path_id)
    .fetch_all(exec)
    .await?)
}

/// Courses the user has completed. Completion is the certificate, which
/// outlives the enrollment row.
async fn completed_courses<'c, E: PgExecutor<'c>>(exec: E, user_id: Uuid) -> Result<HashSet<Uuid>, DbError> {
    let rows = sqlx::query("SELECT course_id FROM certificates WHERE user_id = $1")
    .bind(user_id)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|r| Ok(r.try_get::<Uuid, _>("course_id")?))
        .collect()
}

/// After `course_id` is completed, close out any enrolled path it finishes
/// and pay the path bonus once.
pub(crate) async fn complete_paths_for_course(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
    rules: &XpRules,
    now: DateTime<Utc>,
) -> Result<Vec<PathCompletion>, DbError> {
    let rows = sqlx::query(
        r#"
        SELECT pe.path_id
        FROM learning_path_enrollments pe
        JOIN learning_path_courses pc ON pc.path_id = pe.path_id
        WHERE pe.user_id = $1 AND pc.course_id = $2 AND pe.completed_at IS NULL
        FOR UPDATE OF pe
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(&mut *conn)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let completed = completed_courses(&mut *conn, user_id).await?;
    let mut finished = Vec::new();

    for row in rows {
        let path_id: Uuid = row.try_get("path_id")?;
        let courses: Vec<Uuid> = path_courses(&mut *conn, path_id)
            .await?
            .into_iter()
            .map(|c| c.course_id)
            .collect();

        if !PathProgress::from_courses(&courses, &completed).is_complete {
            continue;
        }

        sqlx::query(
            "UPDATE learning_path_enrollments SET completed_at = $3 WHERE user_id = $1 AND path_id = $2",
        )
        .bind(user_id)
        .bind(path_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let xp_awarded = award_xp(&mut *conn, user_id, XpSource::PathCompleted, path_id, rules).await?;
        tracing::info!(user_id = %user_id, path_id = %path_id, xp_awarded, "learning path completed");
        finished.push(PathCompletion { path_id, xp_awarded });
    }

    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::fixtures;
    use crate::db::{EnrollmentRepo, ProgressionRepo};
    use academy_core::AcademyConfig;

    async fn path_of(pool: &PgPool, courses: &[Uuid]) -> PathDetail {
        let repo = PathRepo::new(pool);
        let path = repo
            .create(
                Slug::new(&format!("p-{}", Uuid::new_v4().simple())).unwrap(),
                Title::new("Fixture path").unwrap(),
                Body::default(),
                true,
            )
            .await
            .expect("path");
        for course_id in courses {
            repo.add_course(path.id, *course_id).await.expect("add course");
        }
        repo.get(path.id).await.expect("detail")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn path_progress_survives_unenroll_and_completes_once() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let first = fixtures::course(&pool, user.id, 1, None).await;
        let second = fixtures::course(&pool, user.id, 1, None).await;
        let detail = path_of(&pool, &[first.course.id, second.course.id]).await;

        let paths = PathRepo::new(&pool);
        let enrollments = EnrollmentRepo::new(&pool);
        let progression = ProgressionRepo::new(&pool, &config);
        paths.enroll(user.id, detail.path.id).await.expect("path enroll");

        enrollments.enroll(user.id, first.course.id).await.expect("enroll first");
        let done = progression
            .complete_lesson(user.id, first.lessons[0].id)
            .await
            .expect("complete first");
        assert!(done.progress.paths_completed.is_empty());
        assert_eq!(paths.progress(user.id, &detail).await.expect("progress").completed_courses, 1);

        enrollments.unenroll(user.id, first.course.id).await.expect("unenroll first");
        let after = paths.progress(user.id, &detail).await.expect("progress");
        assert_eq!(after.completed_courses, 1);
        assert_eq!(after.percent, 50);
        assert_eq!(after.next_course, Some(second.course.id));

        enrollments.enroll(user.id, second.course.id).await.expect("enroll second");
        let finished = progression
            .complete_lesson(user.id, second.lessons[0].id)
            .await
            .expect("complete second");
        assert_eq!(finished.progress.paths_completed.len(), 1);
        assert_eq!(finished.progress.paths_completed[0].path_id, detail.path.id);
        assert_eq!(finished.progress.paths_completed[0].xp_awarded, 250);
        assert!(paths.progress(user.id, &detail).await.expect("progress").is_complete);

        // Going through the first course again pays nothing more
        enrollments.enroll(user.id, first.course.id).await.expect("re-enroll first");
        let repeat = progression
            .complete_lesson(user.id, first.lessons[0].id)
            .await
            .expect("repeat");
        assert!(repeat.progress.paths_completed.is_empty());
        assert_eq!(fixtures::ledger_count(&pool, user.id, "path_completed").await, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn path_enrollment_twice_conflicts() {
        let pool = fixtures::pool().await;
        let user = fixtures::user(&pool).await;
        let detail = path_of(&pool, &[]).await;

        let paths = PathRepo::new(&pool);
        paths.enroll(user.id, detail.path.id).await.expect("enroll");
        let err = paths.enroll(user.id, detail.path.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(paths.is_enrolled(user.id, detail.path.id).await.expect("enrolled"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn page_past_the_end_still_reports_total() {
        let pool = fixtures::pool().await;
        path_of(&pool, &[]).await;

        let page = PathRepo::new(&pool)
            .list_published(Pagination::new(100_000, 10))
            .await
            .expect("page");
        assert!(page.items.is_empty());
        assert!(page.total >= 1);
    }
}
