//! CSV report downloads.

use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::Report;

/// Report download routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/student/:id", get(student_report))
        .route("/instructor/:id", get(instructor_report))
}

/// Serve a rendered report as a CSV download.
fn attachment(report: Report) -> Response {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ),
        ],
        report.content,
    )
        .into_response()
}

/// CSV of a student's enrollments: subject, grade and state per row.
///
/// Only the student or an admin may download it.
#[utoipa::path(
    get,
    path = "/api/reports/student/{id}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Student user ID")),
    responses(
        (status = 200, description = "CSV report", content_type = "text/csv", body = String),
        (status = 403, description = "Neither admin nor the student"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn student_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    user.ensure_self_or_admin(id)?;
    let report = state.services.reports().student_report(id).await?;
    Ok(attachment(report))
}

/// CSV of an instructor's subjects with the average grade of each
#[utoipa::path(
    get,
    path = "/api/reports/instructor/{id}",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instructor user ID")),
    responses(
        (status = 200, description = "CSV report", content_type = "text/csv", body = String),
        (status = 403, description = "Neither admin nor the instructor"),
        (status = 404, description = "Instructor not found")
    )
)]
pub async fn instructor_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    user.ensure_self_or_admin(id)?;
    let report = state.services.reports().instructor_report(id).await?;
    Ok(attachment(report))
}
