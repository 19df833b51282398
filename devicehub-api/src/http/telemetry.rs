//! Telemetry ingestion and query handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use devicehub_core::models::{CreateTelemetryRequest, DeviceId, Telemetry};

use super::{AppError, AppResult, AppState};

/// Acknowledgement for device-facing writes
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// humantime duration such as `30m`, `1h` or `24h`
    pub duration: Option<String>,
}

/// POST /api/telemetry/iot/telemetry
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    payload: Result<Json<CreateTelemetryRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let telemetry = state.services.telemetry_service.ingest(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Telemetry inserted successfully".to_string(),
            data: telemetry,
        }),
    ))
}

/// GET /api/telemetry/{device_id}?duration=1h
pub async fn get_history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<Telemetry>>> {
    let window = match query.duration.as_deref() {
        Some(raw) => humantime::parse_duration(raw).map_err(|_| {
            AppError::bad_request(format!(
                "invalid duration {raw:?} (examples: 30m, 1h, 24h)"
            ))
        })?,
        None => state.default_history_window,
    };

    let readings = state
        .services
        .telemetry_service
        .history(&DeviceId::from(device_id), window)
        .await?;
    Ok(Json(readings))
}

/// GET /api/telemetry/{device_id}/latest
pub async fn get_latest(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<Telemetry>> {
    let telemetry = state
        .services
        .telemetry_service
        .latest(&DeviceId::from(device_id))
        .await?;
    Ok(Json(telemetry))
}
