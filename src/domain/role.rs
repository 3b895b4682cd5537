//! Role catalogue.
//!
//! The set of roles is fixed and seeded by migration; users reference at
//! most one of them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{ROLE_ADMIN, ROLE_INSTRUCTOR, ROLE_STUDENT};
use crate::errors::AppError;

/// Capability-bearing role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Instructor,
    Student,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::Instructor, RoleName::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => ROLE_ADMIN,
            RoleName::Instructor => ROLE_INSTRUCTOR,
            RoleName::Student => ROLE_STUDENT,
        }
    }

    /// Human-readable label seeded alongside the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleName::Admin => "Administrador",
            RoleName::Instructor => "Instructor",
            RoleName::Student => "Estudiante",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleName::Admin => "Manages users, subjects and reports",
            RoleName::Instructor => "Grades and closes assigned subjects",
            RoleName::Student => "Enrolls in subjects",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role names resolve to `NotFound`, matching a missing role row.
impl std::str::FromStr for RoleName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(RoleName::Admin),
            ROLE_INSTRUCTOR => Ok(RoleName::Instructor),
            ROLE_STUDENT => Ok(RoleName::Student),
            _ => Err(AppError::NotFound),
        }
    }
}

/// Seeded role row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Role {
    pub id: i32,
    pub name: RoleName,
    pub display_name: String,
    pub description: String,
}
