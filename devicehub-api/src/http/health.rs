//! Health check and metrics endpoints

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::http::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        devicehub_core::metrics::gather_metrics(),
    )
}
