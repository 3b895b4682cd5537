//! HTTP request handlers.

pub mod auth_handler;
pub mod instructor_handler;
pub mod notification_handler;
pub mod report_handler;
pub mod student_handler;
pub mod subject_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use instructor_handler::instructor_routes;
pub use notification_handler::notification_routes;
pub use report_handler::report_routes;
pub use student_handler::student_routes;
pub use subject_handler::{admin_subject_routes, subject_routes};
pub use user_handler::{admin_user_routes, user_routes};
