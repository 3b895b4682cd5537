//! User domain entity, profiles and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RoleName;
use crate::config::{DEFAULT_INSTRUCTOR_MAX_CREDITS, DEFAULT_STUDENT_MAX_CREDITS};

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Option<RoleName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.role == Some(role)
    }

    /// "First Last" when either part is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Input for inserting a user row
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Option<RoleName>,
}

/// User response DTO (excludes sensitive fields)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<RoleName>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Student extension of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StudentProfile {
    pub user_id: Uuid,
    pub max_credits_per_term: i32,
}

impl StudentProfile {
    pub fn with_defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            max_credits_per_term: DEFAULT_STUDENT_MAX_CREDITS,
        }
    }
}

/// Instructor extension of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct InstructorProfile {
    pub user_id: Uuid,
    pub max_credits_per_term: i32,
}

impl InstructorProfile {
    pub fn with_defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            max_credits_per_term: DEFAULT_INSTRUCTOR_MAX_CREDITS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: "hashed".to_string(),
            role: Some(RoleName::Student),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(user("Jane", "Doe").display_name(), "Jane Doe");
        assert_eq!(user("Jane", "").display_name(), "Jane");
        assert_eq!(user("", "").display_name(), "jdoe");
    }

    #[test]
    fn test_profile_defaults() {
        let id = Uuid::new_v4();
        assert_eq!(StudentProfile::with_defaults(id).max_credits_per_term, 16);
        assert_eq!(InstructorProfile::with_defaults(id).max_credits_per_term, 20);
    }

    #[test]
    fn test_response_hides_hash() {
        let json = serde_json::to_string(&UserResponse::from(user("a", "b"))).unwrap();
        assert!(!json.contains("hashed"));
        assert!(json.contains("\"role\":\"student\""));
    }
}
