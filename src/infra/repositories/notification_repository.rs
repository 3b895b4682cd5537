//! Notification inbox rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::notification::{self, Entity as NotificationEntity};
use super::SeaStore;
use crate::domain::{NewNotification, Notification};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Notification repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// New unread notification for `notification.user_id`
    async fn insert_notification(&self, notification: NewNotification) -> AppResult<Notification>;

    /// The user's notifications, newest first
    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;

    /// Mark read; `NotFound` unless the notification belongs to `user_id`
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<Notification>;

    /// Delete read notifications created before `read_before`; returns rows deleted
    async fn purge_notifications(&self, read_before: DateTime<Utc>) -> AppResult<u64>;
}

#[async_trait]
impl<C> NotificationRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let model = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            kind: Set(new.kind),
            message: Set(new.message),
            read: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(self.connection())
        .await?;

        Ok(Notification::from(model))
    }

    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let models = NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(self.connection())
            .await?;

        Ok(models.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<Notification> {
        let model = NotificationEntity::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(self.connection())
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: notification::ActiveModel = model.into();
        active.read = Set(true);
        let model = active.update(self.connection()).await?;

        Ok(Notification::from(model))
    }

    async fn purge_notifications(&self, read_before: DateTime<Utc>) -> AppResult<u64> {
        let result = NotificationEntity::delete_many()
            .filter(notification::Column::Read.eq(true))
            .filter(notification::Column::CreatedAt.lt(read_before))
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected)
    }
}
