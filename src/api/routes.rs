//! Application route configuration.

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    admin_subject_routes, admin_user_routes, auth_routes, instructor_routes,
    notification_routes, report_routes, student_routes, subject_routes, user_routes,
};
use super::middleware::{
    admin_only, auth_middleware, instructor_only, request_metrics, student_only,
};
use super::openapi::ApiDoc;
use super::AppState;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // OpenAPI Swagger UI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes(state.clone()))
        // Global middleware
        .layer(middleware::from_fn(request_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `/api` tree. Role gates run after authentication has injected the caller.
fn api_routes(state: AppState) -> Router<AppState> {
    let admin = admin_user_routes()
        .merge(admin_subject_routes())
        .route_layer(middleware::from_fn(admin_only));

    let authenticated = Router::new()
        .merge(user_routes())
        .nest("/subjects", subject_routes())
        .nest("/notifications", notification_routes())
        .nest("/reports", report_routes())
        .nest("/admin", admin)
        .nest(
            "/students",
            student_routes().route_layer(middleware::from_fn(student_only)),
        )
        .nest(
            "/instructors",
            instructor_routes().route_layer(middleware::from_fn(instructor_only)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .nest("/auth", auth_routes())
        .merge(authenticated)
}

/// Root endpoint
async fn root() -> &'static str {
    "Academic Records API"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

/// Individual service health status
#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
}

/// Service status
#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint with store connectivity check
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, database) = match state.uow.ping().await {
        Ok(()) => (
            StatusCode::OK,
            ServiceStatus {
                status: "healthy",
                error: None,
            },
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ServiceStatus {
                status: "unhealthy",
                error: Some(e.to_string()),
            },
        ),
    };

    let response = HealthResponse {
        status: if status_code == StatusCode::OK {
            "healthy"
        } else {
            "degraded"
        },
        services: ServiceHealth { database },
    };

    (status_code, Json(response))
}
