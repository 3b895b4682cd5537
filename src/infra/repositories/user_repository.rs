//! Users, the role catalogue and the per-role profiles.
//!
//! A user row points at at most one role through `role_id`. Every read
//! joins the role so callers always see a `User` with its `RoleName`
//! resolved. Profiles are separate tables keyed by the user id and are
//! never removed when the role changes.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{
    instructor_profile, role,
    role::Entity as RoleEntity,
    student_profile,
    user::{self, Entity as UserEntity},
};
use super::SeaStore;
use crate::domain::{InstructorProfile, NewUser, Role, RoleName, StudentProfile, User};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Implemented by `SeaStore` over both the pooled connection and an open
/// transaction, and by `MemoryStore` for tests.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID, role resolved
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by login name
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// List all users ordered by username
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// List users holding the given role
    async fn list_users_with_role(&self, role: RoleName) -> AppResult<Vec<User>>;

    /// Create a new user.
    ///
    /// The role, when given, must already exist in the catalogue. A duplicate
    /// username or email surfaces as `AppError::Conflict`.
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;

    /// Point the user at another role.
    ///
    /// Returns `NotFound` for an unknown user. Existing profiles are left
    /// alone; creating the profile for the new role is the caller's job.
    async fn update_user_role(&self, id: Uuid, role: RoleName) -> AppResult<User>;

    /// Delete the user and everything that cascades from it.
    ///
    /// Profiles, enrollments and notifications go with the row. Subjects the
    /// user taught keep existing with no instructor.
    async fn delete_user(&self, id: Uuid) -> AppResult<()>;
}

/// Read access to the seeded role catalogue.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// All roles, in seed order
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    async fn find_role(&self, name: RoleName) -> AppResult<Option<Role>>;
}

/// Student and instructor profiles, keyed by user id.
///
/// Inserting a second profile of the same kind for a user is a `Conflict`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_student_profile(&self, user_id: Uuid) -> AppResult<Option<StudentProfile>>;

    async fn insert_student_profile(&self, profile: StudentProfile) -> AppResult<StudentProfile>;

    async fn find_instructor_profile(&self, user_id: Uuid)
        -> AppResult<Option<InstructorProfile>>;

    async fn insert_instructor_profile(
        &self,
        profile: InstructorProfile,
    ) -> AppResult<InstructorProfile>;
}

/// Look up the seeded row for `name`; a missing row means the seed never ran.
async fn role_row<C: ConnectionTrait>(conn: &C, name: RoleName) -> AppResult<role::Model> {
    RoleEntity::find()
        .filter(role::Column::Name.eq(name.as_str()))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::internal(format!("Role '{}' is not seeded", name)))
}

#[async_trait]
impl<C> UserRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .find_also_related(RoleEntity)
            .one(self.connection())
            .await?;

        Ok(result.map(|(model, role)| user::into_domain(model, role)))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .find_also_related(RoleEntity)
            .one(self.connection())
            .await?;

        Ok(result.map(|(model, role)| user::into_domain(model, role)))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = UserEntity::find()
            .find_also_related(RoleEntity)
            .order_by_asc(user::Column::Username)
            .all(self.connection())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(model, role)| user::into_domain(model, role))
            .collect())
    }

    async fn list_users_with_role(&self, role: RoleName) -> AppResult<Vec<User>> {
        let rows = UserEntity::find()
            .find_also_related(RoleEntity)
            .filter(role::Column::Name.eq(role.as_str()))
            .order_by_asc(user::Column::Username)
            .all(self.connection())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(model, role)| user::into_domain(model, role))
            .collect())
    }

    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        let role = match new_user.role {
            Some(name) => Some(role_row(self.connection(), name).await?),
            None => None,
        };

        let now = Utc::now();
        let active_model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            password_hash: Set(new_user.password_hash),
            role_id: Set(role.as_ref().map(|r| r.id)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::from_write(e, "User"))?;

        Ok(user::into_domain(model, role))
    }

    async fn update_user_role(&self, id: Uuid, role: RoleName) -> AppResult<User> {
        // Load first so an unknown id is NotFound rather than a zero-row update.
        let model = UserEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or(AppError::NotFound)?;
        let role = role_row(self.connection(), role).await?;

        let mut active: user::ActiveModel = model.into();
        active.role_id = Set(Some(role.id));
        active.updated_at = Set(Utc::now());

        let model = active.update(self.connection()).await?;
        Ok(user::into_domain(model, Some(role)))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id).exec(self.connection()).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl<C> RoleRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        RoleEntity::find()
            .order_by_asc(role::Column::Id)
            .all(self.connection())
            .await?
            .into_iter()
            .map(Role::try_from)
            .collect()
    }

    async fn find_role(&self, name: RoleName) -> AppResult<Option<Role>> {
        RoleEntity::find()
            .filter(role::Column::Name.eq(name.as_str()))
            .one(self.connection())
            .await?
            .map(Role::try_from)
            .transpose()
    }
}

#[async_trait]
impl<C> ProfileRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_student_profile(&self, user_id: Uuid) -> AppResult<Option<StudentProfile>> {
        let result = student_profile::Entity::find_by_id(user_id)
            .one(self.connection())
            .await?;

        Ok(result.map(StudentProfile::from))
    }

    async fn insert_student_profile(&self, profile: StudentProfile) -> AppResult<StudentProfile> {
        let model = student_profile::ActiveModel {
            user_id: Set(profile.user_id),
            max_credits_per_term: Set(profile.max_credits_per_term),
        }
        .insert(self.connection())
        .await
        .map_err(|e| AppError::from_write(e, "Student profile"))?;

        Ok(StudentProfile::from(model))
    }

    async fn find_instructor_profile(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<InstructorProfile>> {
        let result = instructor_profile::Entity::find_by_id(user_id)
            .one(self.connection())
            .await?;

        Ok(result.map(InstructorProfile::from))
    }

    async fn insert_instructor_profile(
        &self,
        profile: InstructorProfile,
    ) -> AppResult<InstructorProfile> {
        let model = instructor_profile::ActiveModel {
            user_id: Set(profile.user_id),
            max_credits_per_term: Set(profile.max_credits_per_term),
        }
        .insert(self.connection())
        .await
        .map_err(|e| AppError::from_write(e, "Instructor profile"))?;

        Ok(InstructorProfile::from(model))
    }
}
