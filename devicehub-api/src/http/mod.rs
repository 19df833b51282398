// Module: http
// HTTP/JSON API for devices and dashboards

pub mod device;
pub mod error;
pub mod health;
pub mod middleware;
pub mod stream;
pub mod telemetry;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use devicehub_broker::{Broker, RegistrySnapshot};
use devicehub_core::bootstrap::Services;
use devicehub_core::config::StreamConfig;
use devicehub_core::Config;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub services: Arc<Services>,
    pub broker: Broker,
    pub stream: Arc<StreamConfig>,
    pub keep_alive: Duration,
    pub default_history_window: Duration,
}

impl AppState {
    pub fn new(config: &Config, services: Services, broker: Broker) -> anyhow::Result<Self> {
        let default_history_window = config
            .telemetry
            .default_history_window()
            .map_err(|e| anyhow::anyhow!("Invalid telemetry.default_history_window: {e}"))?;

        Ok(Self {
            services: Arc::new(services),
            broker,
            stream: Arc::new(config.stream.clone()),
            keep_alive: config.keep_alive_interval(),
            default_history_window,
        })
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check and metrics endpoints (for monitoring probes)
        .merge(health::create_health_router())
        // Device-facing ingestion
        .route("/api/telemetry/iot/telemetry", post(telemetry::ingest_telemetry))
        .route("/api/telemetry/iot/status", post(device::update_status))
        // Device registry
        .route(
            "/api/devices",
            post(device::create_device)
                .get(device::list_devices)
                .delete(device::delete_devices),
        )
        .route(
            "/api/devices/{device_id}",
            get(device::get_device).put(device::update_device),
        )
        // Queries
        .route("/api/telemetry/{device_id}", get(telemetry::get_history))
        .route("/api/telemetry/{device_id}/latest", get(telemetry::get_latest))
        .route("/api/devices/{device_id}/status", get(device::get_status))
        // Live stream
        .route("/api/telemetry/{device_id}/stream", get(stream::stream_device))
        // Diagnostics
        .route("/api/broker/stats", get(broker_stats))
        // Apply layers before state
        .route_layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/broker/stats
async fn broker_stats(State(state): State<AppState>) -> AppResult<Json<RegistrySnapshot>> {
    Ok(Json(state.broker.snapshot().await?))
}
