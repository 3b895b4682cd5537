//! User, role and admin account handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{AdminStatistics, Role, RoleName, UserResponse};
use crate::errors::AppResult;
use crate::services::NewAccount;

/// Admin request to create a user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150, message = "Username is required"))]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Optional role; when set the matching profile is provisioned
    pub role: Option<RoleName>,
}

/// Role assignment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    #[schema(example = "student")]
    pub role: String,
}

/// Routes available to any authenticated user
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_current_user))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/roles", get(list_roles))
}

/// Admin-only account routes, nested under `/admin`
pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/assign_role", post(assign_role))
        .route("/users/:id/change_role", post(assign_role))
        .route("/statistics", get(statistics))
}

/// Get the calling user
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.accounts().get_user(current_user.id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.services.accounts().list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.accounts().get_user(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// List the fixed role set
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Roles", body = Vec<Role>))
)]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(state.services.accounts().list_roles().await?))
}

/// Create a user, optionally with a role.
///
/// With a role, the matching profile is created in the same transaction
/// and the user receives a welcome notification.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .services
        .accounts()
        .create_user(NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: payload.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Assign or change a user's role.
///
/// The profile for the new role is created if missing; earlier profiles
/// stay. The change applies to the user's next request, without a new login.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/assign_role",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = UserResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn assign_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .accounts()
        .assign_role(id, &payload.role)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user together with their profiles and enrollments
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.accounts().delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dashboard statistics
#[utoipa::path(
    get,
    path = "/api/admin/statistics",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Statistics", body = AdminStatistics),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn statistics(State(state): State<AppState>) -> AppResult<Json<AdminStatistics>> {
    Ok(Json(state.services.statistics().admin_statistics().await?))
}
