//! Instructor profile entity, one row per instructor user.

use sea_orm::entity::prelude::*;

use crate::domain::InstructorProfile;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "instructor_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub max_credits_per_term: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for InstructorProfile {
    fn from(model: Model) -> Self {
        InstructorProfile {
            user_id: model.user_id,
            max_credits_per_term: model.max_credits_per_term,
        }
    }
}
