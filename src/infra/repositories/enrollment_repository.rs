//! Enrollment rows and the bulk grade/close writes.
//!
//! There is one row per (student, subject) pair, enforced by a unique
//! index. Retaking a failed subject reuses that row.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{
    enrollment::{self, Entity as EnrollmentEntity},
    subject::Entity as SubjectEntity,
};
use super::SeaStore;
use crate::domain::{Enrollment, EnrollmentDetail, EnrollmentState, Grade};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Enrollment repository trait for dependency injection.
///
/// State transitions are decided by `EnrollmentService`. The repository
/// stores whatever state it is handed.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// The (student, subject) row, if any
    async fn find_enrollment_for(
        &self,
        student_id: Uuid,
        subject_id: Uuid,
    ) -> AppResult<Option<Enrollment>>;

    /// Enrollment joined with its subject
    async fn find_enrollment_detail(&self, id: Uuid) -> AppResult<Option<EnrollmentDetail>>;

    /// New `enrolled` row with no grade; an existing pair is a `Conflict`
    async fn insert_enrollment(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Enrollment>;

    /// Every enrollment of the student, oldest first
    async fn list_student_enrollments(&self, student_id: Uuid)
        -> AppResult<Vec<EnrollmentDetail>>;

    /// Every enrollment of the subject, oldest first
    async fn list_subject_enrollments(&self, subject_id: Uuid)
        -> AppResult<Vec<EnrollmentDetail>>;

    /// Every enrollment in the system, oldest first. Used by statistics.
    async fn list_enrollments(&self) -> AppResult<Vec<Enrollment>>;

    /// Store a grade together with the state it implies.
    ///
    /// Overwrites any earlier grade. The caller checks that the row is not
    /// closed and that the grade's outcome matches `state`.
    async fn record_grade(
        &self,
        id: Uuid,
        grade: Grade,
        state: EnrollmentState,
    ) -> AppResult<Enrollment>;

    /// Move every enrollment of the subject to `closed`.
    ///
    /// Returns the number of rows touched. Grades are kept as they are.
    async fn close_subject_enrollments(&self, subject_id: Uuid) -> AppResult<u64>;
}

/// Convert joined rows; a row whose subject is missing is an internal error.
fn details(
    rows: Vec<(enrollment::Model, Option<super::entities::subject::Model>)>,
) -> AppResult<Vec<EnrollmentDetail>> {
    rows.into_iter()
        .map(|(model, subject)| enrollment::into_detail(model, subject))
        .collect()
}

#[async_trait]
impl<C> EnrollmentRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_enrollment_for(
        &self,
        student_id: Uuid,
        subject_id: Uuid,
    ) -> AppResult<Option<Enrollment>> {
        EnrollmentEntity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::SubjectId.eq(subject_id))
            .one(self.connection())
            .await?
            .map(Enrollment::try_from)
            .transpose()
    }

    async fn find_enrollment_detail(&self, id: Uuid) -> AppResult<Option<EnrollmentDetail>> {
        EnrollmentEntity::find_by_id(id)
            .find_also_related(SubjectEntity)
            .one(self.connection())
            .await?
            .map(|(model, subject)| enrollment::into_detail(model, subject))
            .transpose()
    }

    async fn insert_enrollment(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Enrollment> {
        let now = Utc::now();
        let model = enrollment::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(student_id),
            subject_id: Set(subject_id),
            state: Set(EnrollmentState::Enrolled.as_str().to_string()),
            grade: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.connection())
        .await
        .map_err(|e| AppError::from_write(e, "Enrollment"))?;

        Enrollment::try_from(model)
    }

    async fn list_student_enrollments(
        &self,
        student_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        let rows = EnrollmentEntity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .find_also_related(SubjectEntity)
            .order_by_asc(enrollment::Column::CreatedAt)
            .all(self.connection())
            .await?;
        details(rows)
    }

    async fn list_subject_enrollments(
        &self,
        subject_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        let rows = EnrollmentEntity::find()
            .filter(enrollment::Column::SubjectId.eq(subject_id))
            .find_also_related(SubjectEntity)
            .order_by_asc(enrollment::Column::CreatedAt)
            .all(self.connection())
            .await?;
        details(rows)
    }

    async fn list_enrollments(&self) -> AppResult<Vec<Enrollment>> {
        EnrollmentEntity::find()
            .order_by_asc(enrollment::Column::CreatedAt)
            .all(self.connection())
            .await?
            .into_iter()
            .map(Enrollment::try_from)
            .collect()
    }

    async fn record_grade(
        &self,
        id: Uuid,
        grade: Grade,
        state: EnrollmentState,
    ) -> AppResult<Enrollment> {
        let model = EnrollmentEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: enrollment::ActiveModel = model.into();
        active.grade = Set(Some(grade.value()));
        active.state = Set(state.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(self.connection()).await?;
        Enrollment::try_from(model)
    }

    async fn close_subject_enrollments(&self, subject_id: Uuid) -> AppResult<u64> {
        let result = EnrollmentEntity::update_many()
            .col_expr(
                enrollment::Column::State,
                Expr::value(EnrollmentState::Closed.as_str()),
            )
            .col_expr(enrollment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(enrollment::Column::SubjectId.eq(subject_id))
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected)
    }
}
