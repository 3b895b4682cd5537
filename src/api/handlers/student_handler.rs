//! Student self-service handlers. Every route acts on the caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Eligibility, EnrollmentDetail};
use crate::errors::AppResult;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EnrollRequest {
    pub subject_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollResponse {
    pub id: Uuid,
}

/// Body returned when eligibility denies an enrollment
#[derive(Debug, Serialize, ToSchema)]
pub struct DeniedResponse {
    #[schema(example = "missing prerequisites")]
    pub detail: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EligibilityResponse {
    pub allowed: bool,
    #[schema(example = "ok")]
    pub reason: String,
}

impl From<Eligibility> for EligibilityResponse {
    fn from(eligibility: Eligibility) -> Self {
        Self {
            allowed: eligibility.is_allowed(),
            reason: eligibility.reason().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GpaResponse {
    #[schema(example = 4.0)]
    pub gpa: f64,
}

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/eligibility/:subject_id", get(eligibility))
        .route("/enroll", post(enroll))
        .route("/enrolled", get(enrolled))
        .route("/approved", get(approved))
        .route("/failed", get(failed))
        .route("/history", get(history))
        .route("/gpa", get(gpa))
}

/// Preview whether the caller may enroll in a subject
#[utoipa::path(
    get,
    path = "/api/students/eligibility/{subject_id}",
    tag = "Students",
    security(("bearer_auth" = [])),
    params(("subject_id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Eligibility decision", body = EligibilityResponse),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn eligibility(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(subject_id): Path<Uuid>,
) -> AppResult<Json<EligibilityResponse>> {
    let decision = state
        .services
        .enrollments()
        .can_enroll(user.id, subject_id)
        .await?;
    Ok(Json(decision.into()))
}

/// Enroll the caller after the eligibility rules pass.
///
/// A denial comes back as 400 with the reason in `detail`, the same text
/// the eligibility preview reports. Enrolling again in a subject the
/// caller already holds returns the existing enrollment.
#[utoipa::path(
    post,
    path = "/api/students/enroll",
    tag = "Students",
    security(("bearer_auth" = [])),
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrolled", body = EnrollResponse),
        (status = 400, description = "Enrollment denied", body = DeniedResponse),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn enroll(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<EnrollRequest>,
) -> AppResult<Response> {
    let enrollments = state.services.enrollments();

    let decision = enrollments.can_enroll(user.id, payload.subject_id).await?;
    if let Eligibility::Denied(reason) = decision {
        let body = DeniedResponse {
            detail: reason.to_string(),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let enrollment = enrollments.enroll(user.id, payload.subject_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse { id: enrollment.id }),
    )
        .into_response())
}

/// Enrollments still waiting for a grade
#[utoipa::path(
    get,
    path = "/api/students/enrolled",
    tag = "Students",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Enrollments in progress", body = Vec<EnrollmentDetail>))
)]
pub async fn enrolled(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<EnrollmentDetail>>> {
    Ok(Json(
        state.services.enrollments().enrolled_subjects(user.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/students/approved",
    tag = "Students",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Approved subjects", body = Vec<EnrollmentDetail>))
)]
pub async fn approved(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<EnrollmentDetail>>> {
    Ok(Json(
        state.services.enrollments().approved_subjects(user.id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/students/failed",
    tag = "Students",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Failed subjects", body = Vec<EnrollmentDetail>))
)]
pub async fn failed(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<EnrollmentDetail>>> {
    Ok(Json(
        state.services.enrollments().failed_subjects(user.id).await?,
    ))
}

/// Every enrollment of the caller in any state, oldest first
#[utoipa::path(
    get,
    path = "/api/students/history",
    tag = "Students",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Every enrollment, oldest first", body = Vec<EnrollmentDetail>))
)]
pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<EnrollmentDetail>>> {
    Ok(Json(state.services.enrollments().history(user.id).await?))
}

/// Mean of the caller's graded enrollments.
///
/// Closed enrollments count with their final grade. Zero when nothing has
/// been graded yet.
#[utoipa::path(
    get,
    path = "/api/students/gpa",
    tag = "Students",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Grade point average", body = GpaResponse))
)]
pub async fn gpa(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<GpaResponse>> {
    let gpa = state.services.enrollments().gpa(user.id).await?;
    Ok(Json(GpaResponse {
        gpa: gpa.to_f64().unwrap_or_default(),
    }))
}
