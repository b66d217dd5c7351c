//! Learning path progress

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathProgress {
    pub total_courses: u32,
    pub completed_courses: u32,
    pub percent: u8,
    pub next_course: Option<Uuid>,
    pub is_complete: bool,
}

impl PathProgress {
    /// `courses` must be in path order; `completed` holds course ids the user
    /// has finished.
    pub fn from_courses(courses: &[Uuid], completed: &HashSet<Uuid>) -> Self {
        let total = courses.len() as u32;
        let done = courses.iter().filter(|c| completed.contains(c)).count() as u32;
        let percent = if total == 0 {
            0
        } else {
            ((done as u64 * 100) / total as u64) as u8
        };

        Self {
            total_courses: total,
            completed_courses: done,
            percent,
            next_course: courses.iter().find(|c| !completed.contains(c)).copied(),
            is_complete: total > 0 && done == total,
        }
    }
}
