//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

/// Academic Records - users, subjects, enrollments and grading
#[derive(Parser, Debug)]
#[command(name = "academic-records")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Manage background jobs
    Jobs(JobsArgs),

    /// Manage user accounts
    Users(UsersArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to (defaults to SERVER_HOST)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to SERVER_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the jobs command
#[derive(Parser, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

/// Scheduled jobs known to the worker
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// Delete read notifications past the retention window
    PurgeNotifications,
    /// Send every instructor a digest of their subjects' averages
    WeeklySummary,
}

/// Job management actions
#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// Start background job worker
    Work,
    /// List pending jobs
    List,
    /// Clear failed jobs
    Clear,
    /// Push a job onto the queue
    Enqueue {
        #[arg(value_enum)]
        job: JobKind,
    },
    /// Execute a job inline, without the queue
    Run {
        #[arg(value_enum)]
        job: JobKind,
    },
}

/// Arguments for the users command
#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersAction,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// Create a user holding the admin role
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_names_are_kebab_case() {
        let cli = Cli::try_parse_from(["academic-records", "jobs", "run", "weekly-summary"]).unwrap();
        match cli.command {
            Commands::Jobs(JobsArgs {
                action: JobsAction::Run { job },
            }) => assert_eq!(job, JobKind::WeeklySummary),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_create_admin_arguments() {
        let cli = Cli::try_parse_from([
            "academic-records",
            "users",
            "create-admin",
            "--username",
            "root",
            "--email",
            "root@example.com",
            "--password",
            "SecurePass123!",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Users(_)));
    }
}
