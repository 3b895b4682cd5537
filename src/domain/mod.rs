//! Domain layer - Core business entities and rules
//!
//! Plain types and pure functions with no storage or transport concerns.

pub mod eligibility;
pub mod enrollment;
pub mod notification;
pub mod password;
pub mod role;
pub mod statistics;
pub mod subject;
pub mod user;

pub use eligibility::{evaluate, DenialReason, Eligibility, EligibilityFacts};
pub use enrollment::{gpa, mean_grade, Enrollment, EnrollmentDetail, EnrollmentState, Grade};
pub use notification::{grade_message, weekly_summary_message, NewNotification, Notification};
pub use password::Password;
pub use role::{Role, RoleName};
pub use statistics::AdminStatistics;
pub use subject::{check_prerequisites, NewSubject, Subject, SubjectChanges};
pub use user::{InstructorProfile, NewUser, StudentProfile, User, UserResponse};
