//! Lesson completion and quiz submission
//!
//! Both operations run as one transaction that starts by locking the
//! learner's enrollment row, so concurrent requests for the same course
//! are serialized:
//!
//! 1. mark the lesson complete or record the quiz attempt
//! 2. recompute course progress, never lowering the stored value
//! 3. pay XP through the ledger (each source pays once)
//! 4. once every lesson is done and every quiz passed, issue the
//!    certificate; the first issuance completes the course, pays the course
//!    bonus and closes out learning paths
//! 5. fold XP, streak and counters into the stats row, then award badges

use std::collections::{HashMap, HashSet};

use academy_core::{
    check_eligibility, is_unlocked, local_date, merge_percent, next_lesson, score, AcademyConfig,
    Answer, AttemptContext, Badge, CourseProgress, LessonSlot, ProgressStatus, QuizPolicy, QuizScore,
    XpRules, XpSource,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use super::certificates::{issue_if_eligible, Certificate};
use super::courses::{fetch_lesson, lesson_order, Lesson};
use super::gamification::{apply_activity, award_badges, award_xp, load_stats, StatsDelta, StatsRow};
use super::paths::{complete_paths_for_course, PathCompletion};
use super::quizzes::{attempt_summary, load_questions, record_attempt};
use super::{count_u32, enrollments, DbError};

/// Course-level effects of a lesson completion
#[derive(Debug, Clone, Serialize)]
pub struct CourseOutcome {
    pub course_id: Uuid,
    pub percent: u8,
    pub status: ProgressStatus,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    /// True only on the request that finished the course
    pub course_completed: bool,
    pub paths_completed: Vec<PathCompletion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonCompletion {
    pub lesson_id: Uuid,
    /// False when the lesson had already been completed
    pub newly_completed: bool,
    pub progress: CourseOutcome,
    pub xp_awarded: u32,
    pub total_xp: u64,
    pub level: u32,
    pub leveled_up: Option<u32>,
    pub certificate: Option<Certificate>,
    pub certificate_issued: bool,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmission {
    pub attempt_id: Uuid,
    pub lesson_id: Uuid,
    #[serde(flatten)]
    pub score: QuizScore,
    pub passing_score: u8,
    pub attempts_used: u32,
    pub attempts_remaining: Option<u32>,
    /// Course effects of a passing attempt
    pub progress: Option<CourseOutcome>,
    pub xp_awarded: u32,
    pub total_xp: u64,
    pub level: u32,
    pub leveled_up: Option<u32>,
    pub certificate: Option<Certificate>,
    pub certificate_issued: bool,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub course_id: Uuid,
    pub enrolled: bool,
    pub percent: u8,
    pub status: ProgressStatus,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub completed_lesson_ids: Vec<Uuid>,
    pub next_lesson_id: Option<Uuid>,
    pub certificate: Option<Certificate>,
}

/// What a learner may do with one lesson right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LessonAccess {
    pub enrolled: bool,
    pub unlocked: bool,
    pub completed: bool,
}

impl LessonAccess {
    /// Content is readable for previews, or when enrolled and unlocked.
    pub fn can_view(&self, lesson: &Lesson) -> bool {
        lesson.is_preview || (self.enrolled && self.unlocked)
    }
}

pub struct ProgressionRepo<'a> {
    pool: &'a PgPool,
    rules: &'a XpRules,
    tz: Tz,
    retry_cooldown_minutes: u32,
}

impl<'a> ProgressionRepo<'a> {
    pub fn new(pool: &'a PgPool, config: &'a AcademyConfig) -> Self {
        Self {
            pool,
            rules: &config.gamification.xp,
            tz: config.gamification.timezone,
            retry_cooldown_minutes: config.quiz.retry_cooldown_minutes,
        }
    }

    pub async fn lesson_access(&self, user_id: Uuid, lesson: &Lesson) -> Result<LessonAccess, DbError> {
        let enrolled = enrollments::find(self.pool, user_id, lesson.course_id, false)
            .await?
            .is_some();
        let order = lesson_order(self.pool, lesson.course_id).await?;
        let completed = completed_lessons(self.pool, user_id, lesson.course_id).await?;

        Ok(LessonAccess {
            enrolled,
            unlocked: is_unlocked(&order, &completed, lesson.id, lesson.sequential),
            completed: completed.contains(&lesson.id),
        })
    }

    pub async fn course_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<ProgressReport, DbError> {
        let enrollment = enrollments::find(self.pool, user_id, course_id, false).await?;
        let order = lesson_order(self.pool, course_id).await?;
        let completed = completed_lessons(self.pool, user_id, course_id).await?;
        let progress = course_progress_of(&order, &completed);

        let stored = enrollment
            .as_ref()
            .map(|e| e.progress_percent.clamp(0, 100) as u8)
            .unwrap_or(0);
        let percent = merge_percent(stored, progress.percent());
        let certificate = super::CertificateRepo::new(self.pool)
            .for_course(user_id, course_id)
            .await?;

        Ok(ProgressReport {
            course_id,
            enrolled: enrollment.is_some(),
            percent,
            status: progress.status(),
            completed_lessons: progress.completed_lessons,
            total_lessons: progress.total_lessons,
            completed_lesson_ids: order
                .iter()
                .filter(|slot| completed.contains(&slot.id))
                .map(|slot| slot.id)
                .collect(),
            next_lesson_id: next_lesson(&order, &completed),
            certificate,
        })
    }

    /// Mark a lesson complete and run everything that follows from it.
    ///
    /// Repeating the call for a completed lesson changes nothing and
    /// reports the current state.
    pub async fn complete_lesson(&self, user_id: Uuid, lesson_id: Uuid) -> Result<LessonCompletion, DbError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let lesson = fetch_lesson(&mut *tx, lesson_id).await?;
        if !lesson.published {
            return Err(DbError::not_found("lesson", lesson_id));
        }

        enrollments::find(&mut *tx, user_id, lesson.course_id, true)
            .await?
            .ok_or(DbError::NotAllowed { reason: "not_enrolled" })?;

        let order = lesson_order(&mut *tx, lesson.course_id).await?;
        let completed = completed_lessons(&mut *tx, user_id, lesson.course_id).await?;
        if !is_unlocked(&order, &completed, lesson_id, lesson.sequential) {
            return Err(DbError::NotAllowed { reason: "lesson_locked" });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, lesson_id, course_id, completed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, lesson_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(lesson.course_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let mut xp = 0;
        if inserted {
            xp += award_xp(&mut *tx, user_id, XpSource::LessonCompleted, lesson_id, self.rules).await?;
            tracing::info!(user_id = %user_id, lesson_id = %lesson_id, "lesson completed");
        }

        let mut completed = completed;
        completed.insert(lesson_id);
        let progress = course_progress_of(&order, &completed);

        let settled = settle_course(&mut *tx, user_id, lesson.course_id, progress, self.rules, now).await?;
        xp += settled.xp;

        let delta = StatsDelta {
            xp,
            lessons: inserted as u32,
            courses: settled.first_completion as u32,
            perfect_quizzes: 0,
        };
        let (stats, leveled_up, new_badges) = if inserted || xp > 0 {
            self.record_activity(&mut *tx, user_id, delta, now).await?
        } else {
            (load_stats(&mut *tx, user_id).await?, None, Vec::new())
        };

        tx.commit().await?;

        let (certificate, certificate_issued) = split_issued(settled.issued);
        Ok(LessonCompletion {
            lesson_id,
            newly_completed: inserted,
            progress: settled.outcome,
            xp_awarded: xp,
            total_xp: stats.total_xp(),
            level: stats.snapshot().level,
            leveled_up,
            certificate,
            certificate_issued,
            new_badges,
        })
    }

    /// Score a quiz attempt and pay out for a first pass.
    pub async fn submit_quiz(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        answers: &HashMap<Uuid, Answer>,
    ) -> Result<QuizSubmission, DbError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let lesson = fetch_lesson(&mut *tx, lesson_id).await?;
        if !lesson.published {
            return Err(DbError::not_found("lesson", lesson_id));
        }
        let questions = load_questions(&mut *tx, lesson_id).await?;
        if questions.is_empty() {
            return Err(DbError::not_found("quiz", lesson_id));
        }

        let enrollment = enrollments::find(&mut *tx, user_id, lesson.course_id, true).await?;
        let order = lesson_order(&mut *tx, lesson.course_id).await?;
        let completed = completed_lessons(&mut *tx, user_id, lesson.course_id).await?;
        let summary = attempt_summary(&mut *tx, user_id, lesson_id).await?;

        let policy = self.policy_for(&lesson);
        let eligibility = check_eligibility(
            &policy,
            &AttemptContext {
                enrolled: enrollment.is_some(),
                unlocked: is_unlocked(&order, &completed, lesson_id, lesson.sequential),
                attempts_used: summary.attempts_used,
                last_attempt_at: summary.last_attempt_at,
                now,
            },
        );
        if !eligibility.is_eligible() {
            tracing::debug!(
                user_id = %user_id,
                lesson_id = %lesson_id,
                reason = eligibility.reason_code(),
                "quiz attempt refused"
            );
            return Err(DbError::Ineligible(eligibility));
        }

        let result = score(&questions, answers, policy.passing_score)?;
        let attempt_id = record_attempt(&mut *tx, user_id, lesson_id, &result, answers, now).await?;
        tracing::info!(
            user_id = %user_id,
            lesson_id = %lesson_id,
            percent = result.percent,
            passed = result.passed,
            "quiz attempt recorded"
        );

        let mut xp = 0;
        if result.passed {
            xp += award_xp(&mut *tx, user_id, XpSource::QuizPassed, lesson_id, self.rules).await?;
        }
        if result.perfect {
            xp += award_xp(&mut *tx, user_id, XpSource::PerfectQuiz, lesson_id, self.rules).await?;
        }

        // A pass can be the last requirement of the course
        let settled = if result.passed {
            let progress = course_progress_of(&order, &completed);
            Some(settle_course(&mut *tx, user_id, lesson.course_id, progress, self.rules, now).await?)
        } else {
            None
        };
        xp += settled.as_ref().map_or(0, |s| s.xp);

        let delta = StatsDelta {
            xp,
            courses: settled.as_ref().is_some_and(|s| s.first_completion) as u32,
            perfect_quizzes: (result.perfect && !summary.perfect_before) as u32,
            ..StatsDelta::default()
        };
        let (stats, leveled_up, new_badges) = self.record_activity(&mut *tx, user_id, delta, now).await?;

        tx.commit().await?;

        let attempts_used = summary.attempts_used + 1;
        let (progress, issued) = match settled {
            Some(settled) => (Some(settled.outcome), settled.issued),
            None => (None, None),
        };
        let (certificate, certificate_issued) = split_issued(issued);
        Ok(QuizSubmission {
            attempt_id,
            lesson_id,
            passing_score: policy.passing_score,
            attempts_used,
            attempts_remaining: policy.max_attempts.map(|max| max.saturating_sub(attempts_used)),
            progress,
            score: result,
            xp_awarded: xp,
            total_xp: stats.total_xp(),
            level: stats.snapshot().level,
            leveled_up,
            certificate,
            certificate_issued,
            new_badges,
        })
    }

    /// Quiz rules for a lesson: its own threshold and attempt cap, the
    /// platform cooldown.
    pub fn policy_for(&self, lesson: &Lesson) -> QuizPolicy {
        QuizPolicy {
            passing_score: lesson.passing_score.clamp(0, 100) as u8,
            max_attempts: lesson.max_attempts.map(|m| m.max(1) as u32),
            retry_cooldown_minutes: self.retry_cooldown_minutes,
        }
    }

    async fn record_activity(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        delta: StatsDelta,
        now: DateTime<Utc>,
    ) -> Result<(StatsRow, Option<u32>, Vec<Badge>), DbError> {
        let update = apply_activity(conn, user_id, delta, local_date(now, self.tz), self.rules).await?;
        let badges = award_badges(conn, user_id, &update.stats).await?;
        Ok((update.stats, update.leveled_up, badges))
    }
}

struct Settled {
    outcome: CourseOutcome,
    xp: u32,
    /// The certificate was issued by this request
    first_completion: bool,
    issued: Option<(Certificate, bool)>,
}

/// Write course progress back to the enrollment and issue the certificate
/// when the course requirements are met. The first issuance is the course
/// completion: it pays the course bonus and closes out learning paths.
/// A re-enrollment only marks its own row completed.
async fn settle_course(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
    progress: CourseProgress,
    rules: &XpRules,
    now: DateTime<Utc>,
) -> Result<Settled, DbError> {
    let issued = issue_if_eligible(&mut *conn, user_id, course_id, progress, now).await?;
    let certified = issued.is_some();
    let first_completion = matches!(issued, Some((_, true)));

    let row = sqlx::query(
        r#"
        UPDATE course_enrollments SET
            progress_percent = GREATEST(progress_percent, $3),
            completed_at = CASE WHEN $4 AND completed_at IS NULL THEN $5 ELSE completed_at END
        WHERE user_id = $1 AND course_id = $2
        RETURNING progress_percent
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(progress.percent() as i32)
    .bind(certified)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    let stored: i32 = row.try_get("progress_percent")?;

    let mut xp = 0;
    let mut paths_completed = Vec::new();

    if first_completion {
        let paid = award_xp(&mut *conn, user_id, XpSource::CourseCompleted, course_id, rules).await?;
        xp += paid;
        tracing::info!(user_id = %user_id, course_id = %course_id, xp = paid, "course completed");

        paths_completed = complete_paths_for_course(conn, user_id, course_id, rules, now).await?;
        xp += paths_completed.iter().map(|p| p.xp_awarded).sum::<u32>();
    }

    Ok(Settled {
        outcome: CourseOutcome {
            course_id,
            percent: merge_percent(stored.clamp(0, 100) as u8, progress.percent()),
            status: progress.status(),
            completed_lessons: progress.completed_lessons,
            total_lessons: progress.total_lessons,
            course_completed: first_completion,
            paths_completed,
        },
        xp,
        first_completion,
        issued,
    })
}

async fn completed_lessons<'c, E: PgExecutor<'c>>(
    exec: E,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<HashSet<Uuid>, DbError> {
    let rows = sqlx::query("SELECT lesson_id FROM user_progress WHERE user_id = $1 AND course_id = $2")
        .bind(user_id)
        .bind(course_id)
        .fetch_all(exec)
        .await?;

    rows.iter()
        .map(|r| Ok(r.try_get::<Uuid, _>("lesson_id")?))
        .collect()
}

/// Progress over the lessons the course has now. Completions of lessons
/// that were since deleted do not count.
fn course_progress_of(order: &[LessonSlot], completed: &HashSet<Uuid>) -> CourseProgress {
    let done = order.iter().filter(|slot| completed.contains(&slot.id)).count();
    CourseProgress::new(count_u32(order.len() as i64), count_u32(done as i64))
}

fn split_issued(issued: Option<(Certificate, bool)>) -> (Option<Certificate>, bool) {
    match issued {
        Some((certificate, fresh)) => (Some(certificate), fresh),
        None => (None, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::fixtures;
    use crate::db::{CertificateRepo, EnrollmentRepo, GamificationRepo, QuizRepo};
    use academy_core::Eligibility;

    fn slot() -> LessonSlot {
        LessonSlot {
            id: Uuid::new_v4(),
            is_preview: false,
        }
    }

    #[test]
    fn deleted_lessons_do_not_count_toward_progress() {
        let order = vec![slot(), slot()];
        let completed: HashSet<Uuid> = [order[0].id, Uuid::new_v4()].into_iter().collect();

        let progress = course_progress_of(&order, &completed);
        assert_eq!(progress.total_lessons, 2);
        assert_eq!(progress.completed_lessons, 1);
        assert_eq!(progress.percent(), 50);
    }

    #[test]
    fn split_issued_reports_freshness() {
        assert!(matches!(split_issued(None), (None, false)));
    }

    #[test]
    fn preview_lessons_are_viewable_without_enrollment() {
        let lesson = Lesson {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Intro".into(),
            content: String::new(),
            position: 1,
            is_preview: true,
            passing_score: 70,
            max_attempts: None,
            sequential: true,
            published: true,
            instructor_id: None,
            question_count: 0,
        };
        let stranger = LessonAccess {
            enrolled: false,
            unlocked: true,
            completed: false,
        };
        assert!(stranger.can_view(&lesson));

        let locked = Lesson {
            is_preview: false,
            ..lesson.clone()
        };
        assert!(!stranger.can_view(&locked));
        assert!(LessonAccess { enrolled: true, ..stranger }.can_view(&locked));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn completing_a_lesson_twice_pays_once() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, None).await;
        EnrollmentRepo::new(&pool).enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        let first = repo.complete_lesson(user.id, fx.lessons[0].id).await.expect("first");
        assert!(first.newly_completed);
        assert!(first.progress.course_completed);
        assert_eq!(first.progress.percent, 100);
        assert!(first.certificate_issued);
        assert_eq!(first.xp_awarded, 110);

        let second = repo.complete_lesson(user.id, fx.lessons[0].id).await.expect("second");
        assert!(!second.newly_completed);
        assert!(!second.progress.course_completed);
        assert_eq!(second.xp_awarded, 0);
        assert!(!second.certificate_issued);
        assert_eq!(second.total_xp, first.total_xp);
        assert_eq!(
            second.certificate.map(|c| c.certificate_number),
            first.certificate.map(|c| c.certificate_number)
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unpassed_quiz_holds_back_course_completion() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 2, None).await;
        let question = fixtures::true_false_quiz(&pool, fx.lessons[0].id).await;
        EnrollmentRepo::new(&pool).enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        repo.complete_lesson(user.id, fx.lessons[0].id).await.expect("lesson 1");
        let last = repo.complete_lesson(user.id, fx.lessons[1].id).await.expect("lesson 2");
        assert_eq!(last.progress.percent, 100);
        assert!(!last.progress.course_completed);
        assert!(last.certificate.is_none());
        assert_eq!(last.xp_awarded, 10);

        let stats = GamificationRepo::new(&pool).stats(user.id).await.expect("stats");
        assert_eq!(stats.courses_completed, 0);
        assert_eq!(fixtures::ledger_count(&pool, user.id, "course_completed").await, 0);

        let failed = repo
            .submit_quiz(user.id, fx.lessons[0].id, &fixtures::answer(&question, false))
            .await
            .expect("failed attempt");
        assert!(failed.progress.is_none());
        assert!(failed.certificate.is_none());

        let passed = repo
            .submit_quiz(user.id, fx.lessons[0].id, &fixtures::answer(&question, true))
            .await
            .expect("passing attempt");
        let outcome = passed.progress.expect("course outcome on a pass");
        assert!(outcome.course_completed);
        assert!(passed.certificate_issued);
        // quiz pass + perfect bonus + course bonus
        assert_eq!(passed.xp_awarded, 25 + 10 + 100);

        let stats = GamificationRepo::new(&pool).stats(user.id).await.expect("stats");
        assert_eq!(stats.courses_completed, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn quiz_retake_after_pass_pays_nothing() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 2, None).await;
        let question = fixtures::true_false_quiz(&pool, fx.lessons[0].id).await;
        EnrollmentRepo::new(&pool).enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        let answers = fixtures::answer(&question, true);
        let first = repo.submit_quiz(user.id, fx.lessons[0].id, &answers).await.expect("first pass");
        assert!(first.score.perfect);
        assert_eq!(first.xp_awarded, 35);

        let retake = repo.submit_quiz(user.id, fx.lessons[0].id, &answers).await.expect("retake");
        assert!(retake.score.passed);
        assert_eq!(retake.attempts_used, 2);
        assert_eq!(retake.xp_awarded, 0);
        assert_eq!(retake.total_xp, first.total_xp);
        assert_eq!(fixtures::ledger_count(&pool, user.id, "quiz_passed").await, 1);
        assert_eq!(fixtures::ledger_count(&pool, user.id, "perfect_quiz").await, 1);

        let stats = GamificationRepo::new(&pool).stats(user.id).await.expect("stats");
        assert_eq!(stats.perfect_quizzes, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn attempt_cap_refuses_further_attempts() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, Some(2)).await;
        let question = fixtures::true_false_quiz(&pool, fx.lessons[0].id).await;
        EnrollmentRepo::new(&pool).enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        let wrong = fixtures::answer(&question, false);
        let first = repo.submit_quiz(user.id, fx.lessons[0].id, &wrong).await.expect("attempt 1");
        assert_eq!(first.attempts_remaining, Some(1));
        let second = repo.submit_quiz(user.id, fx.lessons[0].id, &wrong).await.expect("attempt 2");
        assert_eq!(second.attempts_remaining, Some(0));

        let err = repo
            .submit_quiz(user.id, fx.lessons[0].id, &fixtures::answer(&question, true))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ineligible(Eligibility::AttemptsExhausted { max: 2 })));

        let summary = QuizRepo::new(&pool)
            .attempt_summary(user.id, fx.lessons[0].id)
            .await
            .expect("summary");
        assert_eq!(summary.attempts_used, 2);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn cooldown_refuses_quick_retry() {
        let pool = fixtures::pool().await;
        let mut config = AcademyConfig::default();
        config.quiz.retry_cooldown_minutes = 30;
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, None).await;
        let question = fixtures::true_false_quiz(&pool, fx.lessons[0].id).await;
        EnrollmentRepo::new(&pool).enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        repo.submit_quiz(user.id, fx.lessons[0].id, &fixtures::answer(&question, false))
            .await
            .expect("first attempt");

        let err = repo
            .submit_quiz(user.id, fx.lessons[0].id, &fixtures::answer(&question, true))
            .await
            .unwrap_err();
        match err {
            DbError::Ineligible(Eligibility::CoolingDown { retry_at }) => assert!(retry_at > Utc::now()),
            other => panic!("expected cooldown, got {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unenroll_keeps_progress_and_reenroll_pays_no_second_bonus() {
        let pool = fixtures::pool().await;
        let config = AcademyConfig::default();
        let user = fixtures::user(&pool).await;
        let fx = fixtures::course(&pool, user.id, 1, None).await;
        let enrollments = EnrollmentRepo::new(&pool);
        enrollments.enroll(user.id, fx.course.id).await.expect("enroll");

        let repo = ProgressionRepo::new(&pool, &config);
        let done = repo.complete_lesson(user.id, fx.lessons[0].id).await.expect("complete");
        assert!(done.certificate_issued);

        assert!(enrollments.unenroll(user.id, fx.course.id).await.expect("unenroll"));
        let report = repo.course_progress(user.id, fx.course.id).await.expect("progress");
        assert!(!report.enrolled);
        assert_eq!(report.completed_lessons, 1);
        assert!(report.certificate.is_some());
        let held = CertificateRepo::new(&pool).for_user(user.id).await.expect("certificates");
        assert_eq!(held.len(), 1);

        let again = enrollments.enroll(user.id, fx.course.id).await.expect("re-enroll");
        assert_eq!(again.progress_percent, 100);

        let repeat = repo.complete_lesson(user.id, fx.lessons[0].id).await.expect("repeat");
        assert_eq!(repeat.xp_awarded, 0);
        assert!(!repeat.certificate_issued);
        assert!(!repeat.progress.course_completed);

        let stats = GamificationRepo::new(&pool).stats(user.id).await.expect("stats");
        assert_eq!(stats.courses_completed, 1);
        assert_eq!(fixtures::ledger_count(&pool, user.id, "course_completed").await, 1);
    }
}
