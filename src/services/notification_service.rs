//! Notification service - inbox reads plus the two scheduled jobs.
//!
//! `NotificationSink` is the write-only side other services use to emit
//! notifications after their own mutation has committed.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use super::parallel;
use crate::config::NOTIFICATION_WEEKLY_SUMMARY;
use crate::domain::{mean_grade, weekly_summary_message, NewNotification, Notification, RoleName};
use crate::errors::AppResult;
use crate::infra::{
    EnrollmentRepository, NotificationRepository, SubjectRepository, UnitOfWork, UserRepository,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fire-and-forget notification recorder
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record(&self, user_id: Uuid, kind: &str, message: String) -> AppResult<()>;
}

/// Record through the sink, logging instead of propagating failures.
pub(crate) async fn notify(sink: &dyn NotificationSink, user_id: Uuid, kind: &str, message: String) {
    if let Err(e) = sink.record(user_id, kind, message).await {
        tracing::warn!(user_id = %user_id, kind, error = %e, "Failed to record notification");
    }
}

/// Run `send` once per recipient and return how many succeeded.
///
/// A failed delivery is logged at warn and the remaining recipients are
/// still attempted.
async fn deliver_each<F, Fut>(recipients: &[Uuid], send: F) -> usize
where
    F: Fn(Uuid) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let mut sent = 0;
    for &recipient in recipients {
        match send(recipient).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::warn!(user_id = %recipient, error = %e, "Failed to deliver notification"),
        }
    }
    sent
}

/// Notification service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// The caller's notifications, newest first
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;

    /// Mark one of the caller's notifications read
    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification>;

    /// Delete read notifications older than `retention_days`; returns the count
    async fn purge_expired(&self, retention_days: i64) -> AppResult<u64>;

    /// Send every instructor a digest of their subjects' averages; returns
    /// the number of digests sent
    async fn weekly_instructor_summary(&self) -> AppResult<usize>;
}

/// Concrete implementation of NotificationService and NotificationSink.
pub struct NotificationManager {
    uow: Arc<dyn UnitOfWork>,
}

impl NotificationManager {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Digest body for one instructor. Rosters of the assigned subjects
    /// are loaded concurrently.
    async fn summary_for(&self, instructor_id: Uuid) -> AppResult<String> {
        let store = self.uow.store();
        let subjects = store.list_subjects_for_instructor(instructor_id).await?;
        let rosters = parallel::join_all(
            subjects
                .iter()
                .map(|subject| store.list_subject_enrollments(subject.id))
                .collect(),
        )
        .await?;

        let parts: Vec<(String, Option<Decimal>)> = subjects
            .into_iter()
            .zip(rosters)
            .map(|(subject, rows)| {
                let average = mean_grade(rows.iter().filter_map(|row| row.enrollment.grade));
                (subject.name, average)
            })
            .collect();

        Ok(weekly_summary_message(&parts))
    }

    async fn send_summary(&self, instructor_id: Uuid) -> AppResult<()> {
        let message = self.summary_for(instructor_id).await?;
        self.uow
            .store()
            .insert_notification(NewNotification::new(
                instructor_id,
                NOTIFICATION_WEEKLY_SUMMARY,
                message,
            ))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for NotificationManager {
    async fn record(&self, user_id: Uuid, kind: &str, message: String) -> AppResult<()> {
        self.uow
            .store()
            .insert_notification(NewNotification::new(user_id, kind, message))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationService for NotificationManager {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        self.uow.store().list_notifications(user_id).await
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        self.uow
            .store()
            .mark_notification_read(notification_id, user_id)
            .await
    }

    async fn purge_expired(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let purged = self.uow.store().purge_notifications(cutoff).await?;

        tracing::info!(purged, retention_days, "Purged read notifications");
        Ok(purged)
    }

    async fn weekly_instructor_summary(&self) -> AppResult<usize> {
        let instructors = self
            .uow
            .store()
            .list_users_with_role(RoleName::Instructor)
            .await?;

        let ids: Vec<Uuid> = instructors.iter().map(|i| i.id).collect();
        let sent = deliver_each(&ids, |id| self.send_summary(id)).await;

        tracing::info!(
            instructors = instructors.len(),
            sent,
            "Sent weekly instructor summaries"
        );
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_deliver_each_continues_after_a_failure() {
        let recipients = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let broken = recipients[1];
        let attempted = Mutex::new(Vec::new());

        let sent = deliver_each(&recipients, |id| {
            attempted.lock().unwrap().push(id);
            async move {
                if id == broken {
                    Err(AppError::Internal("insert failed".to_string()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(sent, 2);
        assert_eq!(*attempted.lock().unwrap(), recipients);
    }

    #[tokio::test]
    async fn test_deliver_each_with_no_recipients() {
        let sent = deliver_each(&[], |_| async { Ok(()) }).await;
        assert_eq!(sent, 0);
    }
}
