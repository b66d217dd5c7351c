use std::collections::{HashMap, HashSet};

use academy_core::progress::{CourseProgress, LessonSlot};
use academy_core::quiz::{score, Answer, Question, QuestionKind};
use academy_core::{is_unlocked, merge_percent, XpRules};
use proptest::prelude::*;
use uuid::Uuid;

proptest! {
    /// Property: completing more lessons never lowers the percentage
    #[test]
    fn prop_progress_monotonic(total in 1u32..500, done in 0u32..500) {
        let before = CourseProgress::new(total, done).percent();
        let after = CourseProgress::new(total, done + 1).percent();
        prop_assert!(after >= before);
        prop_assert!(after <= 100);
    }

    /// Property: 100% is reported only for a complete course
    #[test]
    fn prop_hundred_only_when_complete(total in 1u32..500, done in 0u32..500) {
        let p = CourseProgress::new(total, done);
        prop_assert_eq!(p.percent() == 100, p.is_complete());
    }

    /// Property: stored progress never decreases
    #[test]
    fn prop_merge_is_max(stored in 0u8..=100, computed in 0u8..=100) {
        let merged = merge_percent(stored, computed);
        prop_assert!(merged >= stored);
        prop_assert!(merged >= computed);
    }

    /// Property: levels never go down as XP grows
    #[test]
    fn prop_level_monotonic(xp in 0u64..10_000_000, gain in 0u64..100_000) {
        let rules = XpRules::default();
        prop_assert!(rules.level_for_xp(xp + gain) >= rules.level_for_xp(xp));
        let progress = rules.level_progress(xp);
        prop_assert!(progress.percent_to_next < 100);
        prop_assert!(progress.xp_for_next > 0);
    }

    /// Property: score percentage stays within bounds and matches points
    #[test]
    fn prop_score_bounds(correct in prop::collection::vec(any::<bool>(), 1..30)) {
        let questions: Vec<Question> = correct
            .iter()
            .map(|_| Question {
                id: Uuid::new_v4(),
                prompt: "Is it?".into(),
                points: 1,
                kind: QuestionKind::TrueFalse { correct: true },
            })
            .collect();
        let answers: HashMap<Uuid, Answer> = questions
            .iter()
            .zip(&correct)
            .map(|(q, c)| (q.id, Answer::Boolean(*c)))
            .collect();

        let result = score(&questions, &answers, 70).unwrap();
        let expected = correct.iter().filter(|c| **c).count() as u32;
        prop_assert_eq!(result.earned_points, expected);
        prop_assert!(result.percent <= 100);
        prop_assert_eq!(result.perfect, expected == questions.len() as u32);
    }

    /// Property: in a sequential course only the first open lesson is unlocked
    #[test]
    fn prop_sequential_unlocks_prefix(n in 1usize..20, done in 0usize..20) {
        let order: Vec<LessonSlot> = (0..n)
            .map(|_| LessonSlot { id: Uuid::new_v4(), is_preview: false })
            .collect();
        let done = done.min(n);
        let completed: HashSet<Uuid> = order.iter().take(done).map(|s| s.id).collect();

        for (i, slot) in order.iter().enumerate() {
            prop_assert_eq!(is_unlocked(&order, &completed, slot.id, true), i <= done);
        }
    }
}
