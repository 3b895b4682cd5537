//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, instructor_handler, notification_handler, report_handler, student_handler,
    subject_handler, user_handler,
};
use crate::domain::statistics::{
    AcademicPerformance, EnrollmentStatistics, GradeDistribution, SubjectStatistics,
    UserStatistics,
};
use crate::domain::{
    AdminStatistics, DenialReason, Enrollment, EnrollmentDetail, EnrollmentState, Notification,
    Role, RoleName, Subject, UserResponse,
};
use crate::services::TokenResponse;

/// OpenAPI documentation for the academic records API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Academic Records API",
        version = "0.1.0",
        description = "Users, subjects, enrollments, grading and reports",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::login,
        user_handler::get_current_user,
        user_handler::list_users,
        user_handler::get_user,
        user_handler::list_roles,
        user_handler::create_user,
        user_handler::assign_role,
        user_handler::delete_user,
        user_handler::statistics,
        subject_handler::list_subjects,
        subject_handler::get_subject,
        subject_handler::create_subject,
        subject_handler::update_subject,
        subject_handler::delete_subject,
        subject_handler::assign_instructor,
        student_handler::eligibility,
        student_handler::enroll,
        student_handler::enrolled,
        student_handler::approved,
        student_handler::failed,
        student_handler::history,
        student_handler::gpa,
        instructor_handler::assigned_subjects,
        instructor_handler::students,
        instructor_handler::grade,
        instructor_handler::close,
        notification_handler::list_notifications,
        notification_handler::mark_read,
        report_handler::student_report,
        report_handler::instructor_report,
    ),
    components(
        schemas(
            // Domain types
            RoleName,
            Role,
            UserResponse,
            Subject,
            EnrollmentState,
            Enrollment,
            EnrollmentDetail,
            DenialReason,
            Notification,
            AdminStatistics,
            UserStatistics,
            SubjectStatistics,
            EnrollmentStatistics,
            AcademicPerformance,
            GradeDistribution,
            TokenResponse,
            // Request and response bodies
            auth_handler::LoginRequest,
            user_handler::CreateUserRequest,
            user_handler::AssignRoleRequest,
            subject_handler::CreateSubjectRequest,
            subject_handler::UpdateSubjectRequest,
            subject_handler::AssignInstructorRequest,
            student_handler::EnrollRequest,
            student_handler::EnrollResponse,
            student_handler::DeniedResponse,
            student_handler::EligibilityResponse,
            student_handler::GpaResponse,
            instructor_handler::GradeRequest,
            instructor_handler::CloseSubjectRequest,
            instructor_handler::CloseSubjectResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login"),
        (name = "Users", description = "Users and roles"),
        (name = "Subjects", description = "Subject catalogue"),
        (name = "Students", description = "Enrollment and academic history"),
        (name = "Instructors", description = "Rosters, grading and closing"),
        (name = "Notifications", description = "User inbox"),
        (name = "Reports", description = "CSV exports"),
        (name = "Admin", description = "Administration")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}
