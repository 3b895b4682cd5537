//! API middleware.

mod auth;
mod metrics;

pub use auth::{admin_only, auth_middleware, instructor_only, student_only, CurrentUser};
pub use metrics::request_metrics;
