//! In-app notifications.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Grade;
use crate::config::NO_DATA;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Free-form tag such as `welcome`, `grade` or `weekly_summary`
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

pub fn grade_message(grade: Grade, subject_name: &str) -> String {
    format!("Grade {} in {}", grade, subject_name)
}

/// Digest body for one instructor: `"<subject>: <avg>"` joined by `"; "`.
pub fn weekly_summary_message(subjects: &[(String, Option<Decimal>)]) -> String {
    if subjects.is_empty() {
        return NO_DATA.to_string();
    }

    subjects
        .iter()
        .map(|(name, average)| match average {
            Some(avg) => format!("{}: {:.2}", name, avg),
            None => format!("{}: {}", name, NO_DATA),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_message_embeds_rounded_grade() {
        let grade = Grade::from_value(4.46).unwrap();
        assert_eq!(grade_message(grade, "Calculus"), "Grade 4.5 in Calculus");
    }

    #[test]
    fn test_summary_without_subjects() {
        assert_eq!(weekly_summary_message(&[]), "no data");
    }

    #[test]
    fn test_summary_lists_each_subject() {
        let message = weekly_summary_message(&[
            ("Algebra".to_string(), Some(Decimal::new(425, 2))),
            ("Databases".to_string(), None),
        ]);
        assert_eq!(message, "Algebra: 4.25; Databases: no data");
    }
}
