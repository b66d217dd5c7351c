//! Experience points and levels
//!
//! Levels follow a quadratic curve: reaching level `n` takes
//! `level_base * (n - 1)^2` XP, so level 2 is 100 XP, level 3 is 400 XP
//! with the default base.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AcademyError;

/// What an XP award was paid for. Stored as the `xp_events.source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpSource {
    LessonCompleted,
    QuizPassed,
    PerfectQuiz,
    CourseCompleted,
    PathCompleted,
}

impl XpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessonCompleted => "lesson_completed",
            Self::QuizPassed => "quiz_passed",
            Self::PerfectQuiz => "perfect_quiz",
            Self::CourseCompleted => "course_completed",
            Self::PathCompleted => "path_completed",
        }
    }
}

impl fmt::Display for XpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XpSource {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson_completed" => Ok(Self::LessonCompleted),
            "quiz_passed" => Ok(Self::QuizPassed),
            "perfect_quiz" => Ok(Self::PerfectQuiz),
            "course_completed" => Ok(Self::CourseCompleted),
            "path_completed" => Ok(Self::PathCompleted),
            other => Err(AcademyError::UnknownXpSource {
                value: other.to_owned(),
            }),
        }
    }
}

/// XP payout table, loaded from the `[gamification]` config section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct XpRules {
    pub lesson_completed: u32,
    pub quiz_passed: u32,
    pub perfect_quiz_bonus: u32,
    pub course_completed: u32,
    pub path_completed: u32,
    /// XP needed for level 2; later levels scale quadratically
    pub level_base: u64,
}

impl Default for XpRules {
    fn default() -> Self {
        Self {
            lesson_completed: 10,
            quiz_passed: 25,
            perfect_quiz_bonus: 10,
            course_completed: 100,
            path_completed: 250,
            level_base: 100,
        }
    }
}

impl XpRules {
    /// XP paid for a single event of the given kind
    pub fn amount(&self, source: XpSource) -> u32 {
        match source {
            XpSource::LessonCompleted => self.lesson_completed,
            XpSource::QuizPassed => self.quiz_passed,
            XpSource::PerfectQuiz => self.perfect_quiz_bonus,
            XpSource::CourseCompleted => self.course_completed,
            XpSource::PathCompleted => self.path_completed,
        }
    }

    pub fn level_for_xp(&self, xp: u64) -> u32 {
        let base = self.level_base.max(1);
        u32::try_from(isqrt(xp / base).saturating_add(1)).unwrap_or(u32::MAX)
    }

    /// Total XP required to reach `level`
    pub fn xp_for_level(&self, level: u32) -> u64 {
        let steps = level.saturating_sub(1) as u64;
        self.level_base.max(1).saturating_mul(steps.saturating_mul(steps))
    }

    pub fn level_progress(&self, xp: u64) -> LevelProgress {
        let level = self.level_for_xp(xp);
        let floor = self.xp_for_level(level);
        let ceiling = self.xp_for_level(level.saturating_add(1));
        let span = ceiling.saturating_sub(floor);
        let into = xp.saturating_sub(floor);

        LevelProgress {
            level,
            xp_into_level: into,
            xp_for_next: ceiling.saturating_sub(xp),
            percent_to_next: ((into as u128 * 100) / span.max(1) as u128).min(100) as u8,
        }
    }

    /// `Some(new_level)` when going from `before` to `after` XP crosses a level.
    pub fn level_up(&self, before: u64, after: u64) -> Option<u32> {
        let old = self.level_for_xp(before);
        let new = self.level_for_xp(after);
        (new > old).then_some(new)
    }
}

/// Where a user sits inside their current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next: u64,
    pub percent_to_next: u8,
}

/// Integer square root (floor), exact for all u64
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    // Correct any floating point drift at the edges
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}
