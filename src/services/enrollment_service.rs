//! Enrollment service - eligibility, enrollment, grading and closing.
//!
//! `can_enroll` only reads. `enroll` does not re-check eligibility, so
//! callers gate it with `can_enroll` first. Grading and closing run inside
//! one transaction each; notifications go out after commit.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::notification_service::{notify, NotificationSink};
use super::parallel;
use crate::config::NOTIFICATION_GRADE;
use crate::domain::{
    evaluate, gpa, grade_message, DenialReason, Eligibility, EligibilityFacts, Enrollment,
    EnrollmentDetail, EnrollmentState, Grade, RoleName,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{
    EnrollmentRepository, ProfileRepository, SubjectRepository, Transaction, UnitOfWork,
    UserRepository,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Enrollment service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    /// Decide whether the student may enroll. Denials are values, not errors.
    async fn can_enroll(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Eligibility>;

    /// Create the enrollment, or return the one that already exists
    async fn enroll(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Enrollment>;

    async fn enrolled_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>>;

    async fn approved_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>>;

    async fn failed_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>>;

    /// Mean over every graded enrollment; zero when none
    async fn gpa(&self, student_id: Uuid) -> AppResult<Decimal>;

    /// All enrollments, oldest first
    async fn history(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>>;

    /// Enrollments of a subject the instructor teaches; empty otherwise
    async fn students_by_subject(
        &self,
        instructor_id: Uuid,
        subject_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>>;

    /// Grade an enrollment of one of the instructor's subjects
    async fn grade(&self, instructor_id: Uuid, enrollment_id: Uuid, value: f64)
        -> AppResult<Enrollment>;

    /// Close every enrollment of the subject once all of them are graded.
    /// Returns false, changing nothing, when that precondition fails.
    async fn close_subject(&self, instructor_id: Uuid, subject_id: Uuid) -> AppResult<bool>;
}

/// Concrete implementation of EnrollmentService using Unit of Work.
pub struct EnrollmentManager {
    uow: Arc<dyn UnitOfWork>,
    notifications: Arc<dyn NotificationSink>,
}

impl EnrollmentManager {
    pub fn new(uow: Arc<dyn UnitOfWork>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self { uow, notifications }
    }

    async fn in_state(
        &self,
        student_id: Uuid,
        state: EnrollmentState,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        let mut rows = self.uow.store().list_student_enrollments(student_id).await?;
        rows.retain(|row| row.enrollment.state == state);
        Ok(rows)
    }
}

#[async_trait]
impl EnrollmentService for EnrollmentManager {
    async fn can_enroll(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Eligibility> {
        let store = self.uow.store();
        let user = store
            .find_user(student_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !user.has_role(RoleName::Student) {
            return Ok(Eligibility::Denied(DenialReason::NotAuthorized));
        }

        let subject = store
            .find_subject(subject_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let (profile, history) = parallel::join2(
            store.find_student_profile(student_id),
            store.list_student_enrollments(student_id),
        )
        .await?;

        let eligibility = evaluate(&EligibilityFacts {
            user: &user,
            profile: profile.as_ref(),
            subject: &subject,
            history: &history,
        });

        tracing::debug!(
            student_id = %student_id,
            subject_id = %subject_id,
            reason = eligibility.reason(),
            "Eligibility evaluated"
        );
        Ok(eligibility)
    }

    async fn enroll(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Enrollment> {
        let store = self.uow.store();
        if let Some(existing) = store.find_enrollment_for(student_id, subject_id).await? {
            return Ok(existing);
        }
        if store.find_subject(subject_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        match store.insert_enrollment(student_id, subject_id).await {
            Ok(enrollment) => {
                tracing::info!(
                    enrollment_id = %enrollment.id,
                    student_id = %student_id,
                    subject_id = %subject_id,
                    "Student enrolled"
                );
                Ok(enrollment)
            }
            // Lost a race with a concurrent enroll of the same pair.
            Err(AppError::Conflict(entity)) => store
                .find_enrollment_for(student_id, subject_id)
                .await?
                .ok_or(AppError::Conflict(entity)),
            Err(e) => Err(e),
        }
    }

    async fn enrolled_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>> {
        self.in_state(student_id, EnrollmentState::Enrolled).await
    }

    async fn approved_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>> {
        self.in_state(student_id, EnrollmentState::Approved).await
    }

    async fn failed_subjects(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>> {
        self.in_state(student_id, EnrollmentState::Failed).await
    }

    async fn gpa(&self, student_id: Uuid) -> AppResult<Decimal> {
        let rows = self.uow.store().list_student_enrollments(student_id).await?;
        Ok(gpa(rows.iter().map(|row| &row.enrollment)))
    }

    async fn history(&self, student_id: Uuid) -> AppResult<Vec<EnrollmentDetail>> {
        self.uow.store().list_student_enrollments(student_id).await
    }

    async fn students_by_subject(
        &self,
        instructor_id: Uuid,
        subject_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        let mut rows = self.uow.store().list_subject_enrollments(subject_id).await?;
        rows.retain(|row| row.instructor_id == Some(instructor_id));
        Ok(rows)
    }

    async fn grade(
        &self,
        instructor_id: Uuid,
        enrollment_id: Uuid,
        value: f64,
    ) -> AppResult<Enrollment> {
        let grade = Grade::from_value(value)?;

        let tx = self.uow.begin().await?;
        let detail = tx
            .find_enrollment_detail(enrollment_id)
            .await?
            .filter(|row| row.instructor_id == Some(instructor_id))
            .ok_or(AppError::NotFound)?;
        if detail.enrollment.state == EnrollmentState::Closed {
            return Err(AppError::invalid_state(
                "Enrollment is closed and its grade can no longer change",
            ));
        }
        let enrollment = tx
            .record_grade(enrollment_id, grade, grade.outcome())
            .await?;
        tx.commit().await?;

        tracing::info!(
            enrollment_id = %enrollment_id,
            instructor_id = %instructor_id,
            grade = %grade,
            state = %enrollment.state,
            "Enrollment graded"
        );
        notify(
            self.notifications.as_ref(),
            enrollment.student_id,
            NOTIFICATION_GRADE,
            grade_message(grade, &detail.subject_name),
        )
        .await;

        Ok(enrollment)
    }

    async fn close_subject(&self, instructor_id: Uuid, subject_id: Uuid) -> AppResult<bool> {
        let tx = self.uow.begin_serializable().await?;
        let owned = tx
            .find_subject(subject_id)
            .await?
            .is_some_and(|subject| subject.is_taught_by(instructor_id));
        if !owned {
            return Ok(false);
        }

        let rows = tx.list_subject_enrollments(subject_id).await?;
        if rows.is_empty() || rows.iter().any(|row| !row.enrollment.is_graded()) {
            tracing::debug!(subject_id = %subject_id, "Subject not ready to close");
            return Ok(false);
        }

        let closed = tx.close_subject_enrollments(subject_id).await?;
        tx.commit().await?;

        tracing::info!(subject_id = %subject_id, closed, "Subject closed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewSubject, NewUser, StudentProfile};
    use crate::infra::MemoryStore;
    use crate::services::MockNotificationSink;

    struct Seeded {
        store: MemoryStore,
        instructor_id: Uuid,
        student_id: Uuid,
        enrollment_id: Uuid,
    }

    fn new_user(username: &str, role: RoleName) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            role: Some(role),
        }
    }

    async fn seed() -> Seeded {
        let store = MemoryStore::new();
        let instructor = store
            .insert_user(new_user("prof", RoleName::Instructor))
            .await
            .unwrap();
        let student = store
            .insert_user(new_user("ana", RoleName::Student))
            .await
            .unwrap();
        store
            .insert_student_profile(StudentProfile::with_defaults(student.id))
            .await
            .unwrap();
        let subject = store
            .insert_subject(NewSubject {
                name: "Algebra".to_string(),
                code: "ALG".to_string(),
                credits: 4,
                prerequisites: vec![],
            })
            .await
            .unwrap();
        store
            .set_subject_instructor(subject.id, Some(instructor.id))
            .await
            .unwrap();
        let enrollment = store
            .insert_enrollment(student.id, subject.id)
            .await
            .unwrap();

        Seeded {
            store,
            instructor_id: instructor.id,
            student_id: student.id,
            enrollment_id: enrollment.id,
        }
    }

    fn manager(store: &MemoryStore, sink: MockNotificationSink) -> EnrollmentManager {
        EnrollmentManager::new(Arc::new(store.handle()), Arc::new(sink))
    }

    #[tokio::test]
    async fn test_grade_notifies_student_once() {
        let seeded = seed().await;
        let student_id = seeded.student_id;
        let mut sink = MockNotificationSink::new();
        sink.expect_record()
            .withf(move |user_id, kind, message| {
                *user_id == student_id
                    && kind == NOTIFICATION_GRADE
                    && message.as_str() == "Grade 3.0 in Algebra"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let enrollment = manager(&seeded.store, sink)
            .grade(seeded.instructor_id, seeded.enrollment_id, 3.0)
            .await
            .unwrap();
        assert_eq!(enrollment.state, EnrollmentState::Approved);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_undo_grade() {
        let seeded = seed().await;
        let mut sink = MockNotificationSink::new();
        sink.expect_record()
            .times(1)
            .returning(|_, _, _| Err(AppError::internal("sink unavailable")));

        let enrollment = manager(&seeded.store, sink)
            .grade(seeded.instructor_id, seeded.enrollment_id, 2.5)
            .await
            .unwrap();
        assert_eq!(enrollment.state, EnrollmentState::Failed);

        let stored = seeded
            .store
            .find_enrollment_detail(seeded.enrollment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.enrollment.state, EnrollmentState::Failed);
    }

    #[tokio::test]
    async fn test_rejected_grade_sends_nothing() {
        let seeded = seed().await;
        let mut sink = MockNotificationSink::new();
        sink.expect_record().never();

        let result = manager(&seeded.store, sink)
            .grade(seeded.instructor_id, seeded.enrollment_id, 5.1)
            .await;
        assert!(matches!(result, Err(AppError::InvalidGrade(_))));
    }

    #[tokio::test]
    async fn test_close_subject_sends_nothing() {
        let seeded = seed().await;
        let mut sink = MockNotificationSink::new();
        sink.expect_record().times(1).returning(|_, _, _| Ok(()));
        let enrollments = manager(&seeded.store, sink);

        let subject_id = seeded
            .store
            .find_enrollment_detail(seeded.enrollment_id)
            .await
            .unwrap()
            .unwrap()
            .enrollment
            .subject_id;
        enrollments
            .grade(seeded.instructor_id, seeded.enrollment_id, 4.0)
            .await
            .unwrap();
        assert!(enrollments
            .close_subject(seeded.instructor_id, subject_id)
            .await
            .unwrap());
    }
}
