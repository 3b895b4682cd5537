//! Jobs command - Background job management.
//!
//! ## Usage
//!
//! ```bash
//! # Start the job worker
//! academic-records jobs work
//!
//! # Queue a purge for the worker
//! academic-records jobs enqueue purge-notifications
//!
//! # Run the weekly digest inline (e.g. from cron)
//! academic-records jobs run weekly-summary
//!
//! # Inspect or clean the queue
//! academic-records jobs list
//! academic-records jobs clear
//! ```

use apalis::prelude::*;
use apalis_sql::postgres::PostgresStorage;
use apalis_sql::sqlx::postgres::{PgPool, PgPoolOptions};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use crate::cli::args::{JobKind, JobsAction, JobsArgs};
use crate::config::{Config, JOB_NAME_PURGE_NOTIFICATIONS, JOB_NAME_WEEKLY_SUMMARY};
use crate::errors::{AppError, AppResult};
use crate::infra;
use crate::jobs::{
    purge_notifications_handler, weekly_summary_handler, JobContext, PurgeNotificationsJob,
    WeeklySummaryJob,
};
use crate::services::Services;

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: Config) -> AppResult<()> {
    match args.action {
        JobsAction::Work => run_worker(&config).await,
        JobsAction::List => list_jobs(&config).await,
        JobsAction::Clear => clear_failed_jobs(&config).await,
        JobsAction::Enqueue { job } => enqueue(&config, job).await,
        JobsAction::Run { job } => run_inline(config, job).await,
    }
}

fn require_queue(config: &Config) -> AppResult<()> {
    if config.uses_memory_store() {
        return Err(AppError::BadRequest(
            "The job queue needs a Postgres DATABASE_URL; use `jobs run` instead".to_string(),
        ));
    }
    Ok(())
}

/// Connect to Postgres and make sure the apalis tables exist.
async fn queue_pool(config: &Config) -> AppResult<PgPool> {
    require_queue(config)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;

    PostgresStorage::setup(&pool)
        .await
        .map_err(|e| AppError::internal(format!("Failed to setup job storage: {}", e)))?;

    Ok(pool)
}

/// Start the background job worker
///
/// One worker per job type, all sharing the same service container.
async fn run_worker(config: &Config) -> AppResult<()> {
    let pool = queue_pool(config).await?;
    let uow = infra::connect(config).await?;
    let services = Services::from_unit_of_work(uow, config.clone());
    let ctx = JobContext::new(&services);

    let purge_storage: PostgresStorage<PurgeNotificationsJob> = PostgresStorage::new(pool.clone());
    let summary_storage: PostgresStorage<WeeklySummaryJob> = PostgresStorage::new(pool);

    let purge_worker = WorkerBuilder::new(JOB_NAME_PURGE_NOTIFICATIONS)
        .data(ctx.clone())
        .backend(purge_storage)
        .build_fn(purge_notifications_handler);
    let summary_worker = WorkerBuilder::new(JOB_NAME_WEEKLY_SUMMARY)
        .data(ctx)
        .backend(summary_storage)
        .build_fn(weekly_summary_handler);

    tracing::info!("Job worker started. Press Ctrl+C to stop.");

    let monitor = Monitor::new().register(purge_worker).register(summary_worker);

    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                tracing::error!("Worker error: {}", e);
                return Err(AppError::internal(format!("Worker failed: {}", e)));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping worker...");
        }
    }

    tracing::info!("Job worker stopped.");
    Ok(())
}

fn enqueue_failed(e: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Failed to enqueue job: {}", e))
}

/// Push one job onto its queue
async fn enqueue(config: &Config, job: JobKind) -> AppResult<()> {
    let pool = queue_pool(config).await?;

    match job {
        JobKind::PurgeNotifications => {
            let mut storage: PostgresStorage<PurgeNotificationsJob> = PostgresStorage::new(pool);
            storage
                .push(PurgeNotificationsJob::new(config.notification_retention_days))
                .await
                .map_err(enqueue_failed)?;
        }
        JobKind::WeeklySummary => {
            let mut storage: PostgresStorage<WeeklySummaryJob> = PostgresStorage::new(pool);
            storage
                .push(WeeklySummaryJob::default())
                .await
                .map_err(enqueue_failed)?;
        }
    }

    println!("Enqueued {:?}", job);
    Ok(())
}

/// Execute a job in-process against the configured store
async fn run_inline(config: Config, job: JobKind) -> AppResult<()> {
    let retention_days = config.notification_retention_days;
    let uow = infra::connect(&config).await?;
    let services = Services::from_unit_of_work(uow, config);
    let ctx = JobContext::new(&services);

    match job {
        JobKind::PurgeNotifications => {
            let purged = PurgeNotificationsJob::new(retention_days)
                .run(ctx.notifications.as_ref())
                .await?;
            println!("Purged {} notification(s)", purged);
        }
        JobKind::WeeklySummary => {
            let sent = WeeklySummaryJob::default()
                .run(ctx.notifications.as_ref())
                .await?;
            println!("Sent {} weekly summar{}", sent, if sent == 1 { "y" } else { "ies" });
        }
    }

    Ok(())
}

async fn connect_queue_db(config: &Config) -> AppResult<Option<DatabaseConnection>> {
    require_queue(config)?;

    let db = sea_orm::Database::connect(&config.database_url).await?;
    let exists = db
        .query_one(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = 'apalis') as exists",
        ))
        .await?
        .and_then(|r| r.try_get::<bool>("", "exists").ok())
        .unwrap_or(false);

    Ok(exists.then_some(db))
}

/// List job counts per status
async fn list_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = connect_queue_db(config).await? else {
        println!("Job queue not initialized. Run 'jobs work' first to create the queue tables.");
        return Ok(());
    };

    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT job_type, status::text as status, COUNT(*)::bigint as count \
             FROM apalis.jobs GROUP BY job_type, status ORDER BY job_type, status",
        ))
        .await?;

    println!("\n=== Job Queue Status ===");
    if rows.is_empty() {
        println!("(empty)");
    }
    for row in rows {
        if let (Ok(job_type), Ok(status), Ok(count)) = (
            row.try_get::<String>("", "job_type"),
            row.try_get::<String>("", "status"),
            row.try_get::<i64>("", "count"),
        ) {
            println!("{:<40} {:<10} {}", job_type, status, count);
        }
    }
    println!("========================\n");

    Ok(())
}

/// Clear failed jobs from the queue
async fn clear_failed_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = connect_queue_db(config).await? else {
        println!("Job queue not initialized. Nothing to clear.");
        return Ok(());
    };

    let result = db
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "DELETE FROM apalis.jobs WHERE status = 'Failed'",
        ))
        .await?;

    println!("Cleared {} failed job(s) from the queue.", result.rows_affected());
    Ok(())
}
