//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod enrollment;
pub mod instructor_profile;
pub mod notification;
pub mod role;
pub mod student_profile;
pub mod subject;
pub mod subject_prerequisite;
pub mod user;
