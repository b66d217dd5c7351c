//! Milestone badges derived from gamification stats

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AcademyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstLesson,
    FirstCourse,
    Scholar,
    QuizAce,
    WeekStreak,
    LevelFive,
}

impl Badge {
    pub const ALL: [Badge; 6] = [
        Badge::FirstLesson,
        Badge::FirstCourse,
        Badge::Scholar,
        Badge::QuizAce,
        Badge::WeekStreak,
        Badge::LevelFive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstLesson => "first_lesson",
            Self::FirstCourse => "first_course",
            Self::Scholar => "scholar",
            Self::QuizAce => "quiz_ace",
            Self::WeekStreak => "week_streak",
            Self::LevelFive => "level_five",
        }
    }

    fn is_earned(&self, stats: &StatsSnapshot) -> bool {
        match self {
            Self::FirstLesson => stats.lessons_completed >= 1,
            Self::FirstCourse => stats.courses_completed >= 1,
            Self::Scholar => stats.courses_completed >= 5,
            Self::QuizAce => stats.perfect_quizzes >= 1,
            Self::WeekStreak => stats.longest_streak >= 7,
            Self::LevelFive => stats.level >= 5,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| AcademyError::UnknownBadge { value: s.to_owned() })
    }
}

/// Counters a badge decision looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lessons_completed: u32,
    pub courses_completed: u32,
    pub perfect_quizzes: u32,
    pub longest_streak: u32,
    pub level: u32,
}

/// Every badge implied by `stats`.
pub fn earned_badges(stats: &StatsSnapshot) -> BTreeSet<Badge> {
    Badge::ALL.into_iter().filter(|b| b.is_earned(stats)).collect()
}

/// Badges implied by `stats` that the user does not hold yet.
pub fn new_badges(stats: &StatsSnapshot, held: &BTreeSet<Badge>) -> Vec<Badge> {
    earned_badges(stats).difference(held).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_user_has_nothing() {
        assert!(earned_badges(&StatsSnapshot::default()).is_empty());
    }

    #[test]
    fn milestones() {
        let stats = StatsSnapshot {
            lessons_completed: 12,
            courses_completed: 5,
            perfect_quizzes: 0,
            longest_streak: 7,
            level: 4,
        };
        let earned = earned_badges(&stats);
        assert!(earned.contains(&Badge::FirstLesson));
        assert!(earned.contains(&Badge::Scholar));
        assert!(earned.contains(&Badge::WeekStreak));
        assert!(!earned.contains(&Badge::QuizAce));
        assert!(!earned.contains(&Badge::LevelFive));
    }

    #[test]
    fn only_reports_unheld() {
        let stats = StatsSnapshot {
            lessons_completed: 1,
            courses_completed: 1,
            ..StatsSnapshot::default()
        };
        let held: BTreeSet<_> = [Badge::FirstLesson].into_iter().collect();
        assert_eq!(new_badges(&stats, &held), vec![Badge::FirstCourse]);
    }

    #[test]
    fn parses_names() {
        assert_eq!("quiz_ace".parse::<Badge>().unwrap(), Badge::QuizAce);
        assert!("gold_star".parse::<Badge>().is_err());
    }
}
