//! Course, module and lesson repository
//!
//! Lessons are ordered course-wide by (module position, lesson position).
//! Positions are appended as `MAX(position) + 1`; the UNIQUE constraint
//! turns a concurrent append into a conflict instead of a duplicate.

use academy_core::LessonSlot;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::{is_unique_violation, DbError};
use crate::models::{Body, Paginated, Pagination, Slug, Title};

/// Course record from database
#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub instructor_id: Option<Uuid>,
    pub published: bool,
    pub sequential: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course with lesson count for catalog listing
#[derive(Debug, Clone, FromRow)]
pub struct CourseWithCount {
    #[sqlx(flatten)]
    pub course: Course,
    pub lesson_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

/// Lesson joined with the course facts the progression rules need
#[derive(Debug, Clone, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    pub position: i32,
    pub is_preview: bool,
    pub passing_score: i32,
    pub max_attempts: Option<i32>,
    pub sequential: bool,
    pub published: bool,
    pub instructor_id: Option<Uuid>,
    pub question_count: i64,
}

/// Lesson entry in a course outline (no content)
#[derive(Debug, Clone)]
pub struct LessonSummary {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub is_preview: bool,
    pub has_quiz: bool,
}

#[derive(Debug, Clone)]
pub struct ModuleOutline {
    pub module: Module,
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug)]
pub struct NewCourse {
    pub slug: Slug,
    pub title: Title,
    pub description: Body,
    pub instructor_id: Uuid,
    pub sequential: bool,
}

#[derive(Debug)]
pub struct NewLesson {
    pub title: Title,
    pub content: Body,
    pub is_preview: bool,
    pub passing_score: u8,
    pub max_attempts: Option<u32>,
}

const COURSE_COLUMNS: &str =
    "c.id, c.slug, c.title, c.description, c.instructor_id, c.published, c.sequential, c.created_at, c.updated_at";

const LESSON_SELECT: &str = r#"
    SELECT
        l.id, l.module_id, m.course_id, l.title, l.content, l.position,
        l.is_preview, l.passing_score, l.max_attempts,
        c.sequential, c.published, c.instructor_id,
        (SELECT COUNT(*) FROM quiz_questions q WHERE q.lesson_id = l.id) AS question_count
    FROM lessons l
    JOIN course_modules m ON m.id = l.module_id
    JOIN courses c ON c.id = m.course_id
    WHERE l.id = $1
"#;

pub struct CourseRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CourseRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published courses, newest first, with lesson counts. The total is
    /// counted separately so a page past the end still reports it.
    pub async fn list_published(&self, page: Pagination) -> Result<Paginated<CourseWithCount>, DbError> {
        let sql = format!(
            r#"
            SELECT {COURSE_COLUMNS},
                COUNT(l.id) AS lesson_count
            FROM courses c
            LEFT JOIN course_modules m ON m.course_id = c.id
            LEFT JOIN lessons l ON l.module_id = m.id
            WHERE c.published
            GROUP BY c.id
            ORDER BY c.created_at DESC
            LIMIT $1 OFFSET $2
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE published")
            .fetch_one(self.pool)
            .await?;
        let items = rows
            .iter()
            .map(CourseWithCount::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Course, DbError> {
        fetch_course(self.pool, id).await
    }

    /// Modules in order, each with its lessons in order. One query.
    pub async fn outline(&self, course_id: Uuid) -> Result<Vec<ModuleOutline>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id AS module_id, m.course_id, m.title AS module_title, m.position AS module_position,
                l.id AS lesson_id, l.title AS lesson_title, l.position AS lesson_position,
                l.is_preview,
                EXISTS(SELECT 1 FROM quiz_questions q WHERE q.lesson_id = l.id) AS has_quiz
            FROM course_modules m
            LEFT JOIN lessons l ON l.module_id = m.id
            WHERE m.course_id = $1
            ORDER BY m.position, l.position
            "#,
        )
        .bind(course_id)
        .fetch_all(self.pool)
        .await?;

        let mut outline: Vec<ModuleOutline> = Vec::new();
        for row in rows {
            let module_id: Uuid = row.try_get("module_id")?;
            if outline.last().map(|o| o.module.id) != Some(module_id) {
                outline.push(ModuleOutline {
                    module: Module {
                        id: module_id,
                        course_id: row.try_get("course_id")?,
                        title: row.try_get("module_title")?,
                        position: row.try_get("module_position")?,
                    },
                    lessons: Vec::new(),
                });
            }

            let lesson_id: Option<Uuid> = row.try_get("lesson_id")?;
            if let (Some(id), Some(current)) = (lesson_id, outline.last_mut()) {
                current.lessons.push(LessonSummary {
                    id,
                    title: row.try_get("lesson_title")?,
                    position: row.try_get("lesson_position")?,
                    is_preview: row.try_get::<Option<bool>, _>("is_preview")?.unwrap_or(false),
                    has_quiz: row.try_get("has_quiz")?,
                });
            }
        }

        Ok(outline)
    }

    pub async fn lesson(&self, id: Uuid) -> Result<Lesson, DbError> {
        fetch_lesson(self.pool, id).await
    }

    /// Course owning a module, for permission checks
    pub async fn course_for_module(&self, module_id: Uuid) -> Result<Course, DbError> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses c JOIN course_modules m ON m.course_id = c.id WHERE m.id = $1"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(module_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("module", module_id))
    }

    pub async fn create(&self, new: NewCourse) -> Result<Course, DbError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (slug, title, description, instructor_id, sequential)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, slug, title, description, instructor_id, published, sequential, created_at, updated_at
            "#,
        )
        .bind(new.slug.as_str())
        .bind(new.title.as_str())
        .bind(new.description.as_str())
        .bind(new.instructor_id)
        .bind(new.sequential)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    resource: "course",
                    reason: format!("slug '{}' already exists", new.slug.as_str()),
                }
            } else {
                e.into()
            }
        })?;

        tracing::info!(course_id = %course.id, slug = %course.slug, "course created");
        Ok(course)
    }

    pub async fn add_module(&self, course_id: Uuid, title: Title) -> Result<Module, DbError> {
        sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO course_modules (course_id, title, position)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1
            FROM course_modules WHERE course_id = $1
            RETURNING id, course_id, title, position
            "#,
        )
        .bind(course_id)
        .bind(title.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| append_conflict(e, "module", "course"))
    }

    pub async fn add_lesson(&self, module_id: Uuid, new: NewLesson) -> Result<Lesson, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO lessons (module_id, title, content, position, is_preview, passing_score, max_attempts)
            SELECT $1, $2, $3, COALESCE(MAX(position), 0) + 1, $4, $5, $6
            FROM lessons WHERE module_id = $1
            RETURNING id
            "#,
        )
        .bind(module_id)
        .bind(new.title.as_str())
        .bind(new.content.as_str())
        .bind(new.is_preview)
        .bind(new.passing_score as i32)
        .bind(new.max_attempts.map(|m| m as i32))
        .fetch_one(self.pool)
        .await
        .map_err(|e| append_conflict(e, "lesson", "module"))?;

        self.lesson(row.try_get("id")?).await
    }

    pub async fn set_published(&self, course_id: Uuid, published: bool) -> Result<Course, DbError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses SET published = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, slug, title, description, instructor_id, published, sequential, created_at, updated_at
            "#,
        )
        .bind(course_id)
        .bind(published)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("course", course_id))?;

        tracing::info!(course_id = %course_id, published, "course visibility changed");
        Ok(course)
    }
}

fn append_conflict(e: sqlx::Error, resource: &'static str, parent: &'static str) -> DbError {
    if is_unique_violation(&e) {
        DbError::Conflict {
            resource,
            reason: "was appended concurrently, retry".to_string(),
        }
    } else if matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation()) {
        DbError::NotFound {
            resource: parent,
            id: "for new ".to_string() + resource,
        }
    } else {
        e.into()
    }
}

pub(crate) async fn fetch_course<'c, E: PgExecutor<'c>>(exec: E, id: Uuid) -> Result<Course, DbError> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = $1");
    sqlx::query_as::<_, Course>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| DbError::not_found("course", id))
}

pub(crate) async fn fetch_lesson<'c, E: PgExecutor<'c>>(exec: E, id: Uuid) -> Result<Lesson, DbError> {
    sqlx::query_as::<_, Lesson>(LESSON_SELECT)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| DbError::not_found("lesson", id))
}

/// Every lesson of a course in learning order
pub(crate) async fn lesson_order<'c, E: PgExecutor<'c>>(
    exec: E,
    course_id: Uuid,
) -> Result<Vec<LessonSlot>, DbError> {
    let rows = sqlx::query(
        r#"
        SELECT l.id, l.is_preview
        FROM lessons l
        JOIN course_modules m ON m.id = l.module_id
        WHERE m.course_id = $1
        ORDER BY m.position, l.position
        "#,
    )
    .bind(course_id)
    .fetch_all(exec)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(LessonSlot {
                id: r.try_get("id")?,
                is_preview: r.try_get("is_preview")?,
            })
        })
        .collect()
}
