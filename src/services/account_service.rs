//! Account service - users, roles and role-driven profile provisioning.
//!
//! Profiles are additive: assigning a role provisions the matching profile
//! when it is missing and never removes a profile left behind by an earlier
//! role.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::notification_service::{notify, NotificationSink};
use crate::config::{NOTIFICATION_WELCOME, WELCOME_MESSAGE};
use crate::domain::{InstructorProfile, NewUser, Password, Role, RoleName, StudentProfile, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{
    ProfileRepository, RoleRepository, Store, Transaction, UnitOfWork, UserRepository,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Input for creating an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<RoleName>,
}

/// Account service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create a user; when a role is given its profile is provisioned and a
    /// welcome notification recorded
    async fn create_user(&self, account: NewAccount) -> AppResult<User>;

    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Set the user's role, provisioning the matching profile if missing.
    /// Unknown users and role names are `NotFound`.
    async fn assign_role(&self, user_id: Uuid, role_name: &str) -> AppResult<User>;

    async fn delete_user(&self, id: Uuid) -> AppResult<()>;

    async fn list_roles(&self) -> AppResult<Vec<Role>>;
}

/// Create the profile that belongs to `role` unless one already exists.
pub(crate) async fn provision_profile<S>(store: &S, user_id: Uuid, role: RoleName) -> AppResult<()>
where
    S: Store + ?Sized,
{
    match role {
        RoleName::Student => {
            if store.find_student_profile(user_id).await?.is_none() {
                store
                    .insert_student_profile(StudentProfile::with_defaults(user_id))
                    .await?;
                tracing::debug!(user_id = %user_id, "Provisioned student profile");
            }
        }
        RoleName::Instructor => {
            if store.find_instructor_profile(user_id).await?.is_none() {
                store
                    .insert_instructor_profile(InstructorProfile::with_defaults(user_id))
                    .await?;
                tracing::debug!(user_id = %user_id, "Provisioned instructor profile");
            }
        }
        RoleName::Admin => {}
    }
    Ok(())
}

/// Concrete implementation of AccountService using Unit of Work.
pub struct AccountManager {
    uow: Arc<dyn UnitOfWork>,
    notifications: Arc<dyn NotificationSink>,
}

impl AccountManager {
    pub fn new(uow: Arc<dyn UnitOfWork>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self { uow, notifications }
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn create_user(&self, account: NewAccount) -> AppResult<User> {
        let password_hash = Password::new(&account.password)?.into_string();

        let tx = self.uow.begin().await?;
        let user = tx
            .insert_user(NewUser {
                username: account.username,
                email: account.email,
                first_name: account.first_name,
                last_name: account.last_name,
                password_hash,
                role: account.role,
            })
            .await?;
        if let Some(role) = user.role {
            provision_profile(&*tx, user.id, role).await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "User created");
        if user.role.is_some() {
            notify(
                self.notifications.as_ref(),
                user.id,
                NOTIFICATION_WELCOME,
                WELCOME_MESSAGE.to_string(),
            )
            .await;
        }

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.uow
            .store()
            .find_user(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.uow.store().list_users().await
    }

    async fn assign_role(&self, user_id: Uuid, role_name: &str) -> AppResult<User> {
        let role: RoleName = role_name.parse()?;

        let tx = self.uow.begin().await?;
        if tx.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        if tx.find_role(role).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let user = tx.update_user_role(user_id, role).await?;
        provision_profile(&*tx, user_id, role).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, role = %role, "Role assigned");
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.uow.store().delete_user(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.uow.store().list_roles().await
    }
}
