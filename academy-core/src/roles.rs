//! User roles and permission checks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AcademyError;

/// Ordered by privilege: `Student < Instructor < Admin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// May create new courses
    pub fn can_author(&self) -> bool {
        *self >= Role::Instructor
    }

    /// Admins manage everything; instructors only the courses they own.
    pub fn can_manage_course(&self, actor: Uuid, instructor_id: Option<Uuid>) -> bool {
        match self {
            Role::Admin => true,
            Role::Instructor => instructor_id == Some(actor),
            Role::Student => false,
        }
    }

    pub fn can_administer(&self) -> bool {
        *self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            _ => Err(AcademyError::unknown_role(s)),
        }
    }
}
