pub mod badges;
pub mod certificate;
pub mod config;
pub mod error;
pub mod paths;
pub mod progress;
pub mod quiz;
pub mod roles;
pub mod streak;
pub mod xp;

pub use badges::{earned_badges, new_badges, Badge, StatsSnapshot};
pub use certificate::{certificate_number, is_valid_number, CertificateCheck};
pub use config::AcademyConfig;
pub use error::{AcademyError, Result};
pub use paths::PathProgress;
pub use progress::{is_unlocked, merge_percent, next_lesson, CourseProgress, LessonSlot, ProgressStatus};
pub use quiz::{check_eligibility, score, Answer, AttemptContext, Eligibility, Question, QuestionKind, QuizPolicy, QuizScore};
pub use roles::Role;
pub use streak::{local_date, Streak};
pub use xp::{LevelProgress, XpRules, XpSource};
