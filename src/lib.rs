//! Academic Records - users, subjects, enrollments, grading and reports
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core entities and the academic rules over them
//! - **services**: Application use cases
//! - **infra**: Persistence (SeaORM, in-memory store, unit of work)
//! - **jobs**: Scheduled background jobs
//! - **api**: HTTP handlers, middleware, and routes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! academic-records serve
//!
//! # Run migrations
//! academic-records migrate up
//!
//! # Bootstrap the first administrator
//! academic-records users create-admin --username root --email root@example.com --password ...
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Eligibility, Enrollment, EnrollmentState, Grade, RoleName, Subject, User};
pub use errors::{AppError, AppResult};
