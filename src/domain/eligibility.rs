//! Enrollment eligibility rules.
//!
//! Pure decision over already-loaded facts. Rules are checked in a fixed
//! order and the first failing rule decides the reason.

use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{EnrollmentDetail, EnrollmentState, RoleName, StudentProfile, Subject, User};

/// Why an enrollment was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NotAuthorized,
    AlreadyTaken,
    MissingPrerequisites,
    CreditsExceeded,
}

impl DenialReason {
    /// Text shown to the end user
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotAuthorized => "not authorized",
            DenialReason::AlreadyTaken => "already taken or enrolled",
            DenialReason::MissingPrerequisites => "missing prerequisites",
            DenialReason::CreditsExceeded => "credits exceeded",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Allowed,
    Denied(DenialReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Allowed)
    }

    /// `"ok"` when allowed, otherwise the denial text.
    pub fn reason(&self) -> &'static str {
        match self {
            Eligibility::Allowed => "ok",
            Eligibility::Denied(reason) => reason.as_str(),
        }
    }
}

/// Everything the rules look at for one (student, subject) pair.
pub struct EligibilityFacts<'a> {
    pub user: &'a User,
    pub profile: Option<&'a StudentProfile>,
    pub subject: &'a Subject,
    /// Every enrollment the student holds, any state
    pub history: &'a [EnrollmentDetail],
}

/// Decide whether the student may enroll in the subject.
///
/// A student without a profile has a credit limit of zero.
pub fn evaluate(facts: &EligibilityFacts<'_>) -> Eligibility {
    if !facts.user.has_role(RoleName::Student) {
        return Eligibility::Denied(DenialReason::NotAuthorized);
    }

    let target = facts.subject;
    let already_taken = facts.history.iter().any(|row| {
        row.enrollment.subject_id == target.id && row.enrollment.state.blocks_reenrollment()
    });
    if already_taken {
        return Eligibility::Denied(DenialReason::AlreadyTaken);
    }

    let approved: HashSet<Uuid> = facts
        .history
        .iter()
        .filter(|row| row.enrollment.state == EnrollmentState::Approved)
        .map(|row| row.enrollment.subject_id)
        .collect();
    if !target.prerequisites.iter().all(|id| approved.contains(id)) {
        return Eligibility::Denied(DenialReason::MissingPrerequisites);
    }

    let current_load: i64 = facts
        .history
        .iter()
        .filter(|row| row.enrollment.state == EnrollmentState::Enrolled)
        .map(|row| i64::from(row.credits))
        .sum();
    let limit = facts
        .profile
        .map(|p| i64::from(p.max_credits_per_term))
        .unwrap_or(0);
    if current_load + i64::from(target.credits) > limit {
        return Eligibility::Denied(DenialReason::CreditsExceeded);
    }

    Eligibility::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Enrollment, Grade};
    use chrono::Utc;

    fn student(role: Option<RoleName>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn subject(credits: i32, prerequisites: Vec<Uuid>) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: "Subject".to_string(),
            code: "SUB".to_string(),
            credits,
            instructor_id: None,
            prerequisites,
        }
    }

    fn row(student: &User, subject: &Subject, state: EnrollmentState) -> EnrollmentDetail {
        let now = Utc::now();
        let grade = match state {
            EnrollmentState::Approved => Some(Grade::from_value(4.0).unwrap()),
            EnrollmentState::Failed => Some(Grade::from_value(1.0).unwrap()),
            _ => None,
        };
        EnrollmentDetail {
            enrollment: Enrollment {
                id: Uuid::new_v4(),
                student_id: student.id,
                subject_id: subject.id,
                state,
                grade,
                created_at: now,
                updated_at: now,
            },
            subject_name: subject.name.clone(),
            subject_code: subject.code.clone(),
            credits: subject.credits,
            instructor_id: None,
        }
    }

    fn check(
        user: &User,
        profile: Option<&StudentProfile>,
        target: &Subject,
        history: &[EnrollmentDetail],
    ) -> Eligibility {
        evaluate(&EligibilityFacts {
            user,
            profile,
            subject: target,
            history,
        })
    }

    #[test]
    fn test_non_student_not_authorized() {
        let target = subject(3, vec![]);
        for role in [None, Some(RoleName::Admin), Some(RoleName::Instructor)] {
            let user = student(role);
            let profile = StudentProfile::with_defaults(user.id);
            assert_eq!(
                check(&user, Some(&profile), &target, &[]),
                Eligibility::Denied(DenialReason::NotAuthorized)
            );
        }
    }

    #[test]
    fn test_allowed_returns_ok() {
        let user = student(Some(RoleName::Student));
        let profile = StudentProfile::with_defaults(user.id);
        let result = check(&user, Some(&profile), &subject(3, vec![]), &[]);
        assert!(result.is_allowed());
        assert_eq!(result.reason(), "ok");
    }

    #[test]
    fn test_existing_enrollment_blocks_except_failed() {
        let user = student(Some(RoleName::Student));
        let profile = StudentProfile::with_defaults(user.id);
        let target = subject(3, vec![]);

        for state in [
            EnrollmentState::Enrolled,
            EnrollmentState::Approved,
            EnrollmentState::Closed,
        ] {
            let history = vec![row(&user, &target, state)];
            assert_eq!(
                check(&user, Some(&profile), &target, &history).reason(),
                "already taken or enrolled"
            );
        }

        let history = vec![row(&user, &target, EnrollmentState::Failed)];
        assert!(check(&user, Some(&profile), &target, &history).is_allowed());
    }

    #[test]
    fn test_every_prerequisite_must_be_approved() {
        let user = student(Some(RoleName::Student));
        let profile = StudentProfile::with_defaults(user.id);
        let first = subject(3, vec![]);
        let second = subject(3, vec![]);
        let target = subject(3, vec![first.id, second.id]);

        let partial = vec![row(&user, &first, EnrollmentState::Approved)];
        assert_eq!(
            check(&user, Some(&profile), &target, &partial),
            Eligibility::Denied(DenialReason::MissingPrerequisites)
        );

        let failed_second = vec![
            row(&user, &first, EnrollmentState::Approved),
            row(&user, &second, EnrollmentState::Failed),
        ];
        assert_eq!(
            check(&user, Some(&profile), &target, &failed_second).reason(),
            "missing prerequisites"
        );

        let closed_second = vec![
            row(&user, &first, EnrollmentState::Approved),
            row(&user, &second, EnrollmentState::Closed),
        ];
        assert_eq!(
            check(&user, Some(&profile), &target, &closed_second).reason(),
            "missing prerequisites"
        );

        let complete = vec![
            row(&user, &first, EnrollmentState::Approved),
            row(&user, &second, EnrollmentState::Approved),
        ];
        assert!(check(&user, Some(&profile), &target, &complete).is_allowed());
    }

    #[test]
    fn test_credit_limit_counts_only_enrolled() {
        let user = student(Some(RoleName::Student));
        let profile = StudentProfile::with_defaults(user.id);
        let heavy = subject(12, vec![]);
        let passed = subject(10, vec![]);
        let history = vec![
            row(&user, &heavy, EnrollmentState::Enrolled),
            row(&user, &passed, EnrollmentState::Approved),
        ];

        assert!(check(&user, Some(&profile), &subject(4, vec![]), &history).is_allowed());
        assert_eq!(
            check(&user, Some(&profile), &subject(5, vec![]), &history),
            Eligibility::Denied(DenialReason::CreditsExceeded)
        );
    }

    #[test]
    fn test_missing_profile_means_zero_limit() {
        let user = student(Some(RoleName::Student));
        assert_eq!(
            check(&user, None, &subject(1, vec![]), &[]),
            Eligibility::Denied(DenialReason::CreditsExceeded)
        );
    }

    #[test]
    fn test_earliest_rule_wins() {
        let user = student(Some(RoleName::Student));
        let profile = StudentProfile::with_defaults(user.id);
        let prerequisite = subject(3, vec![]);
        let target = subject(40, vec![prerequisite.id]);

        assert_eq!(
            check(&user, Some(&profile), &target, &[]).reason(),
            "missing prerequisites"
        );

        let history = vec![row(&user, &target, EnrollmentState::Enrolled)];
        assert_eq!(
            check(&user, Some(&profile), &target, &history).reason(),
            "already taken or enrolled"
        );
    }
}
