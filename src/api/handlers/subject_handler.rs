//! Subject catalogue handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{NewSubject, Subject, SubjectChanges};
use crate::errors::AppResult;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "Programming II")]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Code is required"))]
    #[schema(example = "PRO102")]
    pub code: String,
    #[validate(range(min = 1, message = "Credits must be a positive integer"))]
    #[schema(example = 3)]
    pub credits: i32,
    #[serde(default)]
    pub prerequisites: Vec<Uuid>,
}

/// Partial update; omitted fields are kept
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(range(min = 1, message = "Credits must be a positive integer"))]
    pub credits: Option<i32>,
    pub prerequisites: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignInstructorRequest {
    pub instructor_user_id: Uuid,
}

/// Read-only catalogue routes for any authenticated user
pub fn subject_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects))
        .route("/:id", get(get_subject))
}

/// Admin-only catalogue routes, nested under `/admin`
pub fn admin_subject_routes() -> Router<AppState> {
    Router::new()
        .route("/subjects", post(create_subject))
        .route("/subjects/:id", put(update_subject).delete(delete_subject))
        .route("/subjects/:id/assign_instructor", post(assign_instructor))
}

/// The whole catalogue ordered by code
#[utoipa::path(
    get,
    path = "/api/subjects",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All subjects", body = Vec<Subject>))
)]
pub async fn list_subjects(State(state): State<AppState>) -> AppResult<Json<Vec<Subject>>> {
    Ok(Json(state.services.subjects().list_subjects().await?))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{id}",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject found", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Subject>> {
    Ok(Json(state.services.subjects().get_subject(id).await?))
}

/// Create a subject.
///
/// Prerequisites must name existing subjects and must not repeat. The new
/// subject has no instructor until one is assigned.
#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Code already in use")
    )
)]
pub async fn create_subject(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSubjectRequest>,
) -> AppResult<(StatusCode, Json<Subject>)> {
    let subject = state
        .services
        .subjects()
        .create_subject(NewSubject {
            name: payload.name,
            code: payload.code,
            credits: payload.credits,
            prerequisites: payload.prerequisites,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Update a subject in place.
///
/// A `prerequisites` field replaces the whole list. Leave it out to keep
/// the current one.
#[utoipa::path(
    put,
    path = "/api/admin/subjects/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn update_subject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSubjectRequest>,
) -> AppResult<Json<Subject>> {
    let subject = state
        .services
        .subjects()
        .update_subject(
            id,
            SubjectChanges {
                name: payload.name,
                code: payload.code,
                credits: payload.credits,
                prerequisites: payload.prerequisites,
            },
        )
        .await?;

    Ok(Json(subject))
}

/// Delete a subject along with its enrollments
#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.subjects().delete_subject(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the subject's instructor.
///
/// The target must hold the instructor role; anyone else is reported as
/// 404 just like a missing user.
#[utoipa::path(
    post,
    path = "/api/admin/subjects/{id}/assign_instructor",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = AssignInstructorRequest,
    responses(
        (status = 200, description = "Instructor assigned", body = Subject),
        (status = 404, description = "Subject or instructor not found")
    )
)]
pub async fn assign_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignInstructorRequest>,
) -> AppResult<Json<Subject>> {
    let subject = state
        .services
        .subjects()
        .assign_instructor(id, payload.instructor_user_id)
        .await?;
    Ok(Json(subject))
}
