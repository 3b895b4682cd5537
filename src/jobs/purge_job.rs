//! Purge of read notifications past the retention window.

use apalis::prelude::Data;
use serde::{Deserialize, Serialize};

use super::JobContext;
use crate::config::{DEFAULT_NOTIFICATION_RETENTION_DAYS, JOB_NAME_PURGE_NOTIFICATIONS};
use crate::errors::{AppError, AppResult};
use crate::services::NotificationService;

/// Purge job payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeNotificationsJob {
    /// Read notifications older than this many days are deleted
    pub retention_days: i64,
}

impl Default for PurgeNotificationsJob {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_NOTIFICATION_RETENTION_DAYS,
        }
    }
}

impl PurgeNotificationsJob {
    pub fn new(retention_days: i64) -> Self {
        Self { retention_days }
    }

    /// Delete the expired notifications and return how many went.
    pub async fn run(&self, notifications: &dyn NotificationService) -> AppResult<u64> {
        if self.retention_days < 0 {
            return Err(AppError::validation("retention_days must not be negative"));
        }

        tracing::info!(
            job = JOB_NAME_PURGE_NOTIFICATIONS,
            retention_days = self.retention_days,
            "Processing purge job"
        );
        notifications.purge_expired(self.retention_days).await
    }
}

/// Purge job handler - processes queued purge jobs
pub async fn purge_notifications_handler(
    job: PurgeNotificationsJob,
    ctx: Data<JobContext>,
) -> Result<(), AppError> {
    let purged = job.run(ctx.notifications.as_ref()).await?;
    tracing::info!(job = JOB_NAME_PURGE_NOTIFICATIONS, purged, "Job finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockNotificationService;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_run_passes_retention_window() {
        let mut notifications = MockNotificationService::new();
        notifications
            .expect_purge_expired()
            .with(eq(90))
            .times(1)
            .returning(|_| Ok(3));

        let purged = PurgeNotificationsJob::default()
            .run(&notifications)
            .await
            .unwrap();
        assert_eq!(purged, 3);
    }

    #[tokio::test]
    async fn test_negative_retention_rejected() {
        let notifications = MockNotificationService::new();
        let result = PurgeNotificationsJob::new(-1).run(&notifications).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(PurgeNotificationsJob::new(30)).unwrap();
        assert_eq!(json, serde_json::json!({ "retention_days": 30 }));
    }
}
