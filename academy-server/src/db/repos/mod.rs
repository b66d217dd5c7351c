//! Repository implementations for database access
//!
//! Each repository borrows the pool. Helpers that must take part in a
//! larger transaction accept `&mut PgConnection` instead.

pub mod certificates;
pub mod courses;
pub mod dashboards;
pub mod enrollments;
pub mod gamification;
pub mod paths;
pub mod progression;
pub mod quizzes;
pub mod users;

#[cfg(test)]
pub(crate) mod fixtures;

pub use certificates::{Certificate, CertificateRepo, HeldCertificate, VerifiedCertificate};
pub use courses::{Course, CourseRepo, CourseWithCount, Lesson, LessonSummary, Module, ModuleOutline, NewCourse, NewLesson};
pub use dashboards::{CourseDashboard, DashboardRepo, PlatformStats};
pub use enrollments::{Enrollment, EnrollmentRepo};
pub use gamification::{GamificationRepo, LeaderboardEntry, StatsRow, XpEvent};
pub use paths::{LearningPath, PathCompletion, PathCourse, PathDetail, PathRepo};
pub use progression::{CourseOutcome, LessonAccess, LessonCompletion, ProgressReport, ProgressionRepo, QuizSubmission};
pub use quizzes::{AttemptSummary, QuizRepo};
pub use users::{User, UserRepo};

use academy_core::{AcademyError, Eligibility};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {resource} {reason}")]
    Conflict { resource: &'static str, reason: String },

    /// Caller is authenticated but the action is not open to them
    #[error("not allowed: {reason}")]
    NotAllowed { reason: &'static str },

    /// Quiz attempt refused by the eligibility rules
    #[error("quiz attempt not allowed: {}", .0.reason_code())]
    Ineligible(Eligibility),

    /// Input rejected by a domain rule
    #[error(transparent)]
    Rule(#[from] AcademyError),

    /// Stored value could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Whether the error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Convert a non-negative count column to u32.
pub(crate) fn count_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
