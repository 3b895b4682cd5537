//! Weekly per-instructor digest.

use apalis::prelude::Data;
use serde::{Deserialize, Serialize};

use super::JobContext;
use crate::config::JOB_NAME_WEEKLY_SUMMARY;
use crate::errors::{AppError, AppResult};
use crate::services::NotificationService;

/// Weekly summary payload. It carries no parameters; every instructor is
/// summarised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummaryJob {}

impl WeeklySummaryJob {
    /// Send the digests and return how many instructors received one.
    pub async fn run(&self, notifications: &dyn NotificationService) -> AppResult<usize> {
        tracing::info!(job = JOB_NAME_WEEKLY_SUMMARY, "Processing weekly summary job");
        notifications.weekly_instructor_summary().await
    }
}

pub async fn weekly_summary_handler(
    job: WeeklySummaryJob,
    ctx: Data<JobContext>,
) -> Result<(), AppError> {
    let sent = job.run(ctx.notifications.as_ref()).await?;
    tracing::info!(job = JOB_NAME_WEEKLY_SUMMARY, sent, "Job finished");
    Ok(())
}
