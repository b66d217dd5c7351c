//! Course progress and sequential lesson unlocking.
//!
//! Progress is always recomputed from completion counts fetched fresh from the
//! database. The stored percentage only ever moves up (see [`merge_percent`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Completion counts for one user in one course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourseProgress {
    pub total_lessons: u32,
    pub completed_lessons: u32,
}

/// Coarse progress state shown on dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CourseProgress {
    pub fn new(total_lessons: u32, completed_lessons: u32) -> Self {
        Self {
            total_lessons,
            completed_lessons,
        }
    }

    /// Integer percentage, floored, in `0..=100`.
    ///
    /// Flooring means 100 is only reported once every lesson is done.
    pub fn percent(&self) -> u8 {
        if self.total_lessons == 0 {
            return 0;
        }
        let done = self.completed_lessons.min(self.total_lessons) as u64;
        ((done * 100) / self.total_lessons as u64) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons >= self.total_lessons
    }

    pub fn status(&self) -> ProgressStatus {
        if self.is_complete() {
            ProgressStatus::Completed
        } else if self.completed_lessons == 0 {
            ProgressStatus::NotStarted
        } else {
            ProgressStatus::InProgress
        }
    }
}

/// Combine the stored percentage with a freshly computed one.
///
/// Stored progress never decreases, even when lessons are added to a course
/// after a learner has moved through it.
pub fn merge_percent(stored: u8, computed: u8) -> u8 {
    stored.max(computed).min(100)
}

/// A lesson's place in the course-wide ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonSlot {
    pub id: Uuid,
    pub is_preview: bool,
}

/// Whether `target` may be opened for completion.
///
/// `order` must list lessons by module position, then lesson position.
pub fn is_unlocked(
    order: &[LessonSlot],
    completed: &HashSet<Uuid>,
    target: Uuid,
    sequential: bool,
) -> bool {
    let Some(index) = order.iter().position(|slot| slot.id == target) else {
        return false;
    };

    if !sequential || index == 0 || completed.contains(&target) {
        return true;
    }

    completed.contains(&order[index - 1].id)
}

/// First lesson in course order that has not been completed yet.
pub fn next_lesson(order: &[LessonSlot], completed: &HashSet<Uuid>) -> Option<Uuid> {
    order
        .iter()
        .find(|slot| !completed.contains(&slot.id))
        .map(|slot| slot.id)
}
