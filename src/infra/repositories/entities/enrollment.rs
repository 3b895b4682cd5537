//! Enrollment database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Enrollment, EnrollmentDetail, Grade};
use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub state: String,
    #[sea_orm(column_type = "Decimal(Some((3, 1)))", nullable)]
    pub grade: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Enrollment {
    type Error = AppError;

    fn try_from(model: Model) -> AppResult<Self> {
        Ok(Enrollment {
            id: model.id,
            student_id: model.student_id,
            subject_id: model.subject_id,
            state: model.state.parse()?,
            grade: model.grade.map(Grade::from_stored),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Join an enrollment row with its subject row.
pub fn into_detail(
    model: Model,
    subject: Option<super::subject::Model>,
) -> AppResult<EnrollmentDetail> {
    let subject = subject
        .ok_or_else(|| AppError::internal(format!("Enrollment {} has no subject", model.id)))?;
    Ok(EnrollmentDetail {
        enrollment: Enrollment::try_from(model)?,
        subject_name: subject.name,
        subject_code: subject.code,
        credits: subject.credits,
        instructor_id: subject.instructor_id,
    })
}
