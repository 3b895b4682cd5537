//! Notification inbox handlers.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::Notification;
use crate::errors::AppResult;

/// Inbox routes for the calling user
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", post(mark_read))
}

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Notifications", body = Vec<Notification>))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(
        state.services.notifications().list_for_user(user.id).await?,
    ))
}

/// Mark one of the caller's notifications read.
///
/// Someone else's notification id is reported as 404, never 403.
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 404, description = "Not one of the caller's notifications")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    Ok(Json(
        state.services.notifications().mark_read(user.id, id).await?,
    ))
}
