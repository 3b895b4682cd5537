//! Instructor handlers: assigned subjects, rosters, grading, closing.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Enrollment, EnrollmentDetail, Subject};
use crate::errors::AppResult;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RosterQuery {
    pub subject_id: Uuid,
}

/// Grade submission. Range checking happens in the service so the
/// offending value is reported as `INVALID_RANGE`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GradeRequest {
    pub enrollment_id: Uuid,
    #[schema(example = 4.5)]
    pub value: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CloseSubjectRequest {
    pub subject_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CloseSubjectResponse {
    pub closed: bool,
}

/// Instructor routes. The router wraps them in `instructor_only`.
pub fn instructor_routes() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(assigned_subjects))
        .route("/students", get(students))
        .route("/grade", post(grade))
        .route("/close", post(close))
}

/// Subjects currently assigned to the caller
#[utoipa::path(
    get,
    path = "/api/instructors/subjects",
    tag = "Instructors",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Subjects assigned to the caller", body = Vec<Subject>))
)]
pub async fn assigned_subjects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Subject>>> {
    Ok(Json(
        state.services.subjects().assigned_subjects(user.id).await?,
    ))
}

/// Enrollments of one of the caller's subjects; empty for anyone else's
#[utoipa::path(
    get,
    path = "/api/instructors/students",
    tag = "Instructors",
    security(("bearer_auth" = [])),
    params(RosterQuery),
    responses((status = 200, description = "Subject roster", body = Vec<EnrollmentDetail>))
)]
pub async fn students(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RosterQuery>,
) -> AppResult<Json<Vec<EnrollmentDetail>>> {
    Ok(Json(
        state
            .services
            .enrollments()
            .students_by_subject(user.id, query.subject_id)
            .await?,
    ))
}

/// Grade one enrollment of a subject the caller teaches.
///
/// The state follows from the value: 3.0 and above approves, anything lower
/// fails. Regrading is allowed until the subject is closed. The student gets
/// a `grade` notification once the write has committed.
#[utoipa::path(
    post,
    path = "/api/instructors/grade",
    tag = "Instructors",
    security(("bearer_auth" = [])),
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Enrollment graded", body = Enrollment),
        (status = 400, description = "Grade outside 0.0-5.0"),
        (status = 404, description = "Enrollment not found for this instructor"),
        (status = 409, description = "Enrollment already closed")
    )
)]
pub async fn grade(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<GradeRequest>,
) -> AppResult<Json<Enrollment>> {
    let enrollment = state
        .services
        .enrollments()
        .grade(user.id, payload.enrollment_id, payload.value)
        .await?;
    Ok(Json(enrollment))
}

/// Close a subject the caller teaches.
///
/// Responds `{"closed": false}` instead of an error when the subject is not
/// the caller's, has no enrollments, or still has an ungraded one.
#[utoipa::path(
    post,
    path = "/api/instructors/close",
    tag = "Instructors",
    security(("bearer_auth" = [])),
    request_body = CloseSubjectRequest,
    responses((status = 200, description = "Whether the subject was closed", body = CloseSubjectResponse))
)]
pub async fn close(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CloseSubjectRequest>,
) -> AppResult<Json<CloseSubjectResponse>> {
    let closed = state
        .services
        .enrollments()
        .close_subject(user.id, payload.subject_id)
        .await?;
    Ok(Json(CloseSubjectResponse { closed }))
}
