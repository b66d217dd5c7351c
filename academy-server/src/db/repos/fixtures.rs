//! Setup shared by the database tests in this module tree
//!
//! DATABASE_URL=postgres://... cargo test -p academy-server -- --ignored
//!
//! Every fixture uses fresh ids and slugs, so tests can share a database.

use std::collections::HashMap;

use academy_core::{Answer, Question, QuestionKind};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Course, CourseRepo, Lesson, NewCourse, NewLesson, QuizRepo, User, UserRepo};
use crate::models::{Body, Slug, Title};

pub(crate) async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = crate::db::create_pool(&url).await.expect("pool");
    crate::db::migrations::run(&pool).await.expect("migrations");
    pool
}

pub(crate) async fn user(pool: &PgPool) -> User {
    UserRepo::new(pool)
        .ensure(Uuid::new_v4(), &format!("{}@test.local", Uuid::new_v4()), None)
        .await
        .expect("user")
}

pub(crate) struct CourseFixture {
    pub course: Course,
    /// In learning order
    pub lessons: Vec<Lesson>,
}

/// A published, sequential course with one module of `lessons` lessons.
pub(crate) async fn course(
    pool: &PgPool,
    instructor_id: Uuid,
    lessons: usize,
    max_attempts: Option<u32>,
) -> CourseFixture {
    let repo = CourseRepo::new(pool);
    let course = repo
        .create(NewCourse {
            slug: Slug::new(&format!("c-{}", Uuid::new_v4().simple())).unwrap(),
            title: Title::new("Fixture course").unwrap(),
            description: Body::default(),
            instructor_id,
            sequential: true,
        })
        .await
        .expect("course");
    let module = repo.add_module(course.id, Title::new("Module").unwrap()).await.expect("module");

    let mut added = Vec::with_capacity(lessons);
    for n in 1..=lessons {
        let lesson = repo
            .add_lesson(
                module.id,
                NewLesson {
                    title: Title::new(&format!("Lesson {n}")).unwrap(),
                    content: Body::default(),
                    is_preview: false,
                    passing_score: 70,
                    max_attempts,
                },
            )
            .await
            .expect("lesson");
        added.push(lesson);
    }

    let course = repo.set_published(course.id, true).await.expect("publish");
    CourseFixture { course, lessons: added }
}

/// Give the lesson a one-question quiz whose answer is `true`.
pub(crate) async fn true_false_quiz(pool: &PgPool, lesson_id: Uuid) -> Question {
    QuizRepo::new(pool)
        .add_question(lesson_id, "The sky is blue", 1, QuestionKind::TrueFalse { correct: true })
        .await
        .expect("question")
}

pub(crate) fn answer(question: &Question, value: bool) -> HashMap<Uuid, Answer> {
    HashMap::from([(question.id, Answer::Boolean(value))])
}

/// Ledger rows of one source for one user
pub(crate) async fn ledger_count(pool: &PgPool, user_id: Uuid, source: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM xp_events WHERE user_id = $1 AND source = $2")
        .bind(user_id)
        .bind(source)
        .fetch_one(pool)
        .await
        .expect("ledger count")
}
