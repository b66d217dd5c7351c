//! Route handlers organized by resource

pub mod admin;
pub mod certificates;
pub mod courses;
pub mod enrollments;
pub mod gamification;
pub mod health;
pub mod instructor;
pub mod lessons;
pub mod paths;
pub mod quizzes;

#[cfg(test)]
pub(crate) mod test_support;
