//! Quiz scoring and attempt eligibility
//!
//! Questions carry their own answer key (`QuestionKind`). Scoring is
//! all-or-nothing per question; the quiz percentage is floored so a pass
//! at 70% really means at least 70% of the points.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AcademyError, Result};

/// Default passing threshold in percent
pub const DEFAULT_PASSING_SCORE: u8 = 70;

/// Question shape plus answer key, stored as JSONB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice { options: Vec<String>, correct: usize },
    MultipleChoice { options: Vec<String>, correct: Vec<usize> },
    TrueFalse { correct: bool },
    ShortAnswer { accepted: Vec<String> },
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleChoice { .. } => "single_choice",
            Self::MultipleChoice { .. } => "multiple_choice",
            Self::TrueFalse { .. } => "true_false",
            Self::ShortAnswer { .. } => "short_answer",
        }
    }

    /// Options shown to the learner, without the key
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::SingleChoice { options, .. } | Self::MultipleChoice { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::SingleChoice { options, correct } => {
                check_options(options)?;
                if *correct >= options.len() {
                    return Err(AcademyError::invalid_question(
                        "correct option index out of range",
                    ));
                }
            }
            Self::MultipleChoice { options, correct } => {
                check_options(options)?;
                if correct.is_empty() {
                    return Err(AcademyError::invalid_question(
                        "multiple choice needs at least one correct option",
                    ));
                }
                if correct.iter().any(|&i| i >= options.len()) {
                    return Err(AcademyError::invalid_question(
                        "correct option index out of range",
                    ));
                }
            }
            Self::TrueFalse { .. } => {}
            Self::ShortAnswer { accepted } => {
                if accepted.iter().all(|a| a.trim().is_empty()) {
                    return Err(AcademyError::invalid_question(
                        "short answer needs at least one accepted answer",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_options(options: &[String]) -> Result<()> {
    if options.len() < 2 {
        return Err(AcademyError::invalid_question(
            "choice questions need at least two options",
        ));
    }
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(AcademyError::invalid_question("options cannot be blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub points: u32,
    pub kind: QuestionKind,
}

impl Question {
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(AcademyError::invalid_question("prompt cannot be empty"));
        }
        if self.points == 0 {
            return Err(AcademyError::invalid_question("points must be positive"));
        }
        self.kind.validate()
    }

    fn is_correct(&self, answer: &Answer) -> Result<bool> {
        let mismatch = || AcademyError::AnswerMismatch {
            id: self.id,
            expected: self.kind.name(),
        };

        let correct = match (&self.kind, answer) {
            (QuestionKind::SingleChoice { correct, .. }, Answer::Choice(picked)) => {
                picked == correct
            }
            (QuestionKind::MultipleChoice { correct, .. }, Answer::Choices(picked)) => {
                let want: HashSet<_> = correct.iter().collect();
                let got: HashSet<_> = picked.iter().collect();
                want == got
            }
            (QuestionKind::TrueFalse { correct }, Answer::Boolean(value)) => value == correct,
            (QuestionKind::ShortAnswer { accepted }, Answer::Text(text)) => {
                let given = text.trim().to_lowercase();
                !given.is_empty() && accepted.iter().any(|a| a.trim().to_lowercase() == given)
            }
            _ => return Err(mismatch()),
        };
        Ok(correct)
    }
}

/// A learner's answer to one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(usize),
    Choices(Vec<usize>),
    Boolean(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub correct: bool,
    pub points_awarded: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub earned_points: u32,
    pub possible_points: u32,
    pub percent: u8,
    pub passed: bool,
    pub perfect: bool,
    pub results: Vec<QuestionResult>,
}

/// Score a submission against the quiz's questions.
pub fn score(
    questions: &[Question],
    answers: &HashMap<Uuid, Answer>,
    passing_score: u8,
) -> Result<QuizScore> {
    if questions.is_empty() {
        return Err(AcademyError::EmptyQuiz);
    }

    if let Some(id) = answers
        .keys()
        .find(|id| !questions.iter().any(|q| q.id == **id))
    {
        return Err(AcademyError::UnknownQuestion { id: *id });
    }

    let mut earned: u64 = 0;
    let mut possible: u64 = 0;
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        possible += question.points as u64;
        let correct = match answers.get(&question.id) {
            Some(answer) => question.is_correct(answer)?,
            None => false,
        };
        let points_awarded = if correct { question.points } else { 0 };
        earned += points_awarded as u64;
        results.push(QuestionResult {
            question_id: question.id,
            correct,
            points_awarded,
        });
    }

    let percent = if possible == 0 {
        0
    } else {
        ((earned * 100) / possible) as u8
    };

    Ok(QuizScore {
        earned_points: earned as u32,
        possible_points: possible as u32,
        percent,
        passed: percent >= passing_score,
        perfect: possible > 0 && earned == possible,
        results,
    })
}

/// Per-lesson quiz rules. The `[quiz]` config section supplies defaults
/// for newly authored lessons and the platform-wide retry cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPolicy {
    pub passing_score: u8,
    pub max_attempts: Option<u32>,
    pub retry_cooldown_minutes: u32,
}

impl Default for QuizPolicy {
    fn default() -> Self {
        Self {
            passing_score: DEFAULT_PASSING_SCORE,
            max_attempts: None,
            retry_cooldown_minutes: 0,
        }
    }
}

/// Facts needed to decide whether another attempt is allowed
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext {
    pub enrolled: bool,
    pub unlocked: bool,
    pub attempts_used: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    NotEnrolled,
    LessonLocked,
    AttemptsExhausted { max: u32 },
    CoolingDown { retry_at: DateTime<Utc> },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Stable machine-readable reason for API error bodies
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::NotEnrolled => "not_enrolled",
            Self::LessonLocked => "lesson_locked",
            Self::AttemptsExhausted { .. } => "attempts_exhausted",
            Self::CoolingDown { .. } => "cooling_down",
        }
    }
}

pub fn check_eligibility(policy: &QuizPolicy, ctx: &AttemptContext) -> Eligibility {
    if !ctx.enrolled {
        return Eligibility::NotEnrolled;
    }
    if !ctx.unlocked {
        return Eligibility::LessonLocked;
    }
    if let Some(max) = policy.max_attempts {
        if ctx.attempts_used >= max {
            return Eligibility::AttemptsExhausted { max };
        }
    }
    if policy.retry_cooldown_minutes > 0 {
        if let Some(last) = ctx.last_attempt_at {
            let retry_at = last + Duration::minutes(policy.retry_cooldown_minutes as i64);
            if ctx.now < retry_at {
                return Eligibility::CoolingDown { retry_at };
            }
        }
    }
    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(points: u32, kind: QuestionKind) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "What?".into(),
            points,
            kind,
        }
    }

    fn opts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn ctx() -> AttemptContext {
        AttemptContext {
            enrolled: true,
            unlocked: true,
            attempts_used: 0,
            last_attempt_at: None,
            now: Utc::now(),
        }
    }

    #[test]
    fn scores_mixed_quiz() {
        let single = q(1, QuestionKind::SingleChoice { options: opts(3), correct: 2 });
        let multi = q(2, QuestionKind::MultipleChoice { options: opts(4), correct: vec![0, 3] });
        let tf = q(1, QuestionKind::TrueFalse { correct: false });
        let text = q(1, QuestionKind::ShortAnswer { accepted: vec!["Ownership".into()] });

        let answers: HashMap<_, _> = [
            (single.id, Answer::Choice(2)),
            (multi.id, Answer::Choices(vec![3, 0])),
            (tf.id, Answer::Boolean(true)),
            (text.id, Answer::Text("  ownership ".into())),
        ]
        .into_iter()
        .collect();

        let result = score(&[single, multi, tf, text], &answers, 70).unwrap();
        assert_eq!(result.earned_points, 4);
        assert_eq!(result.possible_points, 5);
        assert_eq!(result.percent, 80);
        assert!(result.passed);
        assert!(!result.perfect);
    }

    #[test]
    fn multiple_choice_is_all_or_nothing() {
        let multi = q(1, QuestionKind::MultipleChoice { options: opts(3), correct: vec![0, 1] });
        let answers: HashMap<_, _> = [(multi.id, Answer::Choices(vec![0]))].into_iter().collect();
        let result = score(&[multi], &answers, 50).unwrap();
        assert_eq!(result.percent, 0);
        assert!(!result.passed);
    }

    #[test]
    fn unanswered_scores_zero() {
        let tf = q(1, QuestionKind::TrueFalse { correct: true });
        let result = score(&[tf], &HashMap::new(), 70).unwrap();
        assert_eq!(result.earned_points, 0);
        assert!(!result.results[0].correct);
    }

    #[test]
    fn perfect_score_flagged() {
        let tf = q(3, QuestionKind::TrueFalse { correct: true });
        let answers: HashMap<_, _> = [(tf.id, Answer::Boolean(true))].into_iter().collect();
        let result = score(&[tf], &answers, 70).unwrap();
        assert!(result.perfect);
        assert_eq!(result.percent, 100);
    }

    #[test]
    fn passing_threshold_is_inclusive() {
        let questions: Vec<_> = (0..10)
            .map(|_| q(1, QuestionKind::TrueFalse { correct: true }))
            .collect();
        let answers: HashMap<_, _> = questions
            .iter()
            .take(7)
            .map(|q| (q.id, Answer::Boolean(true)))
            .collect();
        let result = score(&questions, &answers, 70).unwrap();
        assert_eq!(result.percent, 70);
        assert!(result.passed);
    }

    #[test]
    fn empty_quiz_rejected() {
        assert_eq!(score(&[], &HashMap::new(), 70), Err(AcademyError::EmptyQuiz));
    }

    #[test]
    fn unknown_question_rejected() {
        let tf = q(1, QuestionKind::TrueFalse { correct: true });
        let stray = Uuid::new_v4();
        let answers: HashMap<_, _> = [(stray, Answer::Boolean(true))].into_iter().collect();
        assert_eq!(
            score(&[tf], &answers, 70),
            Err(AcademyError::UnknownQuestion { id: stray })
        );
    }

    #[test]
    fn mismatched_answer_rejected() {
        let tf = q(1, QuestionKind::TrueFalse { correct: true });
        let answers: HashMap<_, _> = [(tf.id, Answer::Choice(0))].into_iter().collect();
        assert!(matches!(
            score(&[tf], &answers, 70),
            Err(AcademyError::AnswerMismatch { expected: "true_false", .. })
        ));
    }

    #[test]
    fn validation_rules() {
        assert!(q(1, QuestionKind::SingleChoice { options: opts(1), correct: 0 }).validate().is_err());
        assert!(q(1, QuestionKind::SingleChoice { options: opts(2), correct: 2 }).validate().is_err());
        assert!(q(1, QuestionKind::MultipleChoice { options: opts(3), correct: vec![] }).validate().is_err());
        assert!(q(1, QuestionKind::ShortAnswer { accepted: vec!["  ".into()] }).validate().is_err());
        assert!(q(0, QuestionKind::TrueFalse { correct: true }).validate().is_err());
        assert!(q(2, QuestionKind::SingleChoice { options: opts(4), correct: 3 }).validate().is_ok());
    }

    #[test]
    fn kind_json_shape() {
        let kind: QuestionKind = serde_json::from_str(
            r#"{"type":"single_choice","options":["a","b"],"correct":1}"#,
        )
        .unwrap();
        assert_eq!(kind.name(), "single_choice");

        let answer: Answer = serde_json::from_str(r#"{"type":"choices","value":[0,2]}"#).unwrap();
        assert_eq!(answer, Answer::Choices(vec![0, 2]));
    }

    #[test]
    fn eligibility_order() {
        let policy = QuizPolicy::default();
        assert_eq!(
            check_eligibility(&policy, &AttemptContext { enrolled: false, ..ctx() }),
            Eligibility::NotEnrolled
        );
        assert_eq!(
            check_eligibility(&policy, &AttemptContext { unlocked: false, ..ctx() }),
            Eligibility::LessonLocked
        );
        assert!(check_eligibility(&policy, &ctx()).is_eligible());
    }

    #[test]
    fn attempts_exhausted() {
        let policy = QuizPolicy {
            max_attempts: Some(3),
            ..QuizPolicy::default()
        };
        let used = AttemptContext { attempts_used: 3, ..ctx() };
        assert_eq!(
            check_eligibility(&policy, &used),
            Eligibility::AttemptsExhausted { max: 3 }
        );
        let left = AttemptContext { attempts_used: 2, ..ctx() };
        assert!(check_eligibility(&policy, &left).is_eligible());
    }

    #[test]
    fn cooldown_between_attempts() {
        let policy = QuizPolicy {
            retry_cooldown_minutes: 10,
            ..QuizPolicy::default()
        };
        let now = Utc::now();
        let recent = AttemptContext {
            last_attempt_at: Some(now - Duration::minutes(3)),
            now,
            ..ctx()
        };
        let result = check_eligibility(&policy, &recent);
        assert_eq!(result.reason_code(), "cooling_down");

        let old = AttemptContext {
            last_attempt_at: Some(now - Duration::minutes(11)),
            now,
            ..ctx()
        };
        assert!(check_eligibility(&policy, &old).is_eligible());
    }
}
