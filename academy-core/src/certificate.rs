//! Certificate eligibility and numbering

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::progress::CourseProgress;

/// Characters used in the random suffix. Excludes 0/O and 1/I so numbers
/// can be read back over the phone.
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 8;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CERT-[0-9]{8}-[A-HJ-NP-Z2-9]{8}$").expect("invalid certificate regex")
});

/// Inputs for the issuance decision
#[derive(Debug, Clone, Copy)]
pub struct CertificateCheck {
    pub progress: CourseProgress,
    /// Lessons in the course that carry a quiz
    pub quiz_lessons: u32,
    /// Of those, lessons with at least one passed attempt
    pub quizzes_passed: u32,
}

impl CertificateCheck {
    pub fn is_eligible(&self) -> bool {
        self.progress.is_complete() && self.quizzes_passed >= self.quiz_lessons
    }
}

/// Generate a certificate number like `CERT-20240301-7KQ2MZXA`.
pub fn certificate_number<R: Rng + ?Sized>(issued_on: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("CERT-{}-{}", issued_on.format("%Y%m%d"), suffix)
}

/// Cheap format check before a verification lookup
pub fn is_valid_number(s: &str) -> bool {
    if !NUMBER_RE.is_match(s) {
        return false;
    }
    s.get(5..13)
        .is_some_and(|date| NaiveDate::parse_from_str(date, "%Y%m%d").is_ok())
}
