//! Subject database entity for SeaORM.
//!
//! Prerequisite edges live in `subject_prerequisites`.

use sea_orm::entity::prelude::*;

use crate::domain::Subject;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub credits: i32,
    pub instructor_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollment,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn into_domain(model: Model, prerequisites: Vec<Uuid>) -> Subject {
    Subject {
        id: model.id,
        name: model.name,
        code: model.code,
        credits: model.credits,
        instructor_id: model.instructor_id,
        prerequisites,
    }
}
