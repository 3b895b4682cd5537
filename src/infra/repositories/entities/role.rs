//! Role database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Role, RoleName};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub display_name: String,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Role {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let name: RoleName = model
            .name
            .parse()
            .map_err(|_| AppError::internal(format!("Unknown role '{}' in storage", model.name)))?;
        Ok(Role {
            id: model.id,
            name,
            display_name: model.display_name,
            description: model.description,
        })
    }
}
