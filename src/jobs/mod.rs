//! Background jobs.
//!
//! Each job is a serializable payload with a `run` method. The apalis
//! handlers wrap `run` for queued execution; the `jobs run` command calls
//! it inline for cron-style scheduling.

mod purge_job;
mod summary_job;

use std::sync::Arc;

use crate::services::{NotificationService, ServiceContainer};

pub use purge_job::{purge_notifications_handler, PurgeNotificationsJob};
pub use summary_job::{weekly_summary_handler, WeeklySummaryJob};

/// Services shared with job handlers through `Data<JobContext>`
#[derive(Clone)]
pub struct JobContext {
    pub notifications: Arc<dyn NotificationService>,
}

impl JobContext {
    pub fn new(services: &dyn ServiceContainer) -> Self {
        Self {
            notifications: services.notifications(),
        }
    }
}
