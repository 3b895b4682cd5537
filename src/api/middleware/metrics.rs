//! Per-request metrics logging.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use super::CurrentUser;

/// Log path, method, caller, status and latency of every request.
pub async fn request_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let user = response
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    tracing::info!(
        path = %path,
        method = %method,
        user = %user,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
