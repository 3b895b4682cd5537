//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! All services use the Unit of Work for repository access and
//! transaction management.

mod account_service;
mod auth_service;
pub mod container;
mod enrollment_service;
mod notification_service;
mod report_service;
mod statistics_service;
mod subject_service;

// Service Container
pub use container::{parallel, ServiceContainer, Services};

// Service traits and implementations
pub use account_service::{AccountManager, AccountService, NewAccount};
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use enrollment_service::{EnrollmentManager, EnrollmentService};
pub use notification_service::{NotificationManager, NotificationService, NotificationSink};
pub use report_service::{
    render_instructor_report, render_student_report, Report, ReportManager, ReportService,
};
pub use statistics_service::{StatisticsManager, StatisticsService};
pub use subject_service::{SubjectManager, SubjectService};

#[cfg(any(test, feature = "test-utils"))]
pub use account_service::MockAccountService;
#[cfg(any(test, feature = "test-utils"))]
pub use auth_service::MockAuthService;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use enrollment_service::MockEnrollmentService;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_service::{MockNotificationService, MockNotificationSink};
#[cfg(any(test, feature = "test-utils"))]
pub use report_service::MockReportService;
#[cfg(any(test, feature = "test-utils"))]
pub use statistics_service::MockStatisticsService;
#[cfg(any(test, feature = "test-utils"))]
pub use subject_service::MockSubjectService;
