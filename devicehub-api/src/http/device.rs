//! Device registry and status handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use devicehub_core::models::{
    CreateDeviceRequest, Device, DeviceId, DeviceStatus, UpdateDeviceRequest, UpdateStatusRequest,
};

use super::telemetry::MessageResponse;
use super::{AppResult, AppState};

/// POST /api/telemetry/iot/status
pub async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse<DeviceStatus>>> {
    let Json(request) = payload?;
    let status = state
        .services
        .device_status_service
        .update_status(request)
        .await?;

    Ok(Json(MessageResponse {
        message: "Device status updated".to_string(),
        data: status,
    }))
}

/// GET /api/devices/{device_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DeviceStatus>> {
    let status = state
        .services
        .device_status_service
        .get_status(&DeviceId::from(device_id))
        .await?;
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceList {
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDevicesResponse {
    pub message: String,
    pub deleted: usize,
}

/// POST /api/devices
pub async fn create_device(
    State(state): State<AppState>,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let device = state.services.device_service.create_device(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Device Created Successfully".to_string(),
            data: device,
        }),
    ))
}

/// GET /api/devices?owner_id=...
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> AppResult<Json<DeviceList>> {
    let owner_id = query.owner_id.unwrap_or_default();
    let devices = state.services.device_service.list_devices(&owner_id).await?;
    Ok(Json(DeviceList { devices }))
}

/// GET /api/devices/{device_id}
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<MessageResponse<Device>>> {
    let device = state
        .services
        .device_service
        .get_device(&DeviceId::from(device_id))
        .await?;

    Ok(Json(MessageResponse {
        message: "device found".to_string(),
        data: device,
    }))
}

/// PUT /api/devices/{device_id}
pub async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<UpdateDeviceRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse<Device>>> {
    let Json(request) = payload?;
    let device = state
        .services
        .device_service
        .update_device(&DeviceId::from(device_id), request)
        .await?;

    Ok(Json(MessageResponse {
        message: "Device Updated Successfully".to_string(),
        data: device,
    }))
}

/// DELETE /api/devices?owner_id=...
pub async fn delete_devices(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> AppResult<Json<DeleteDevicesResponse>> {
    let owner_id = query.owner_id.unwrap_or_default();
    let deleted = state.services.device_service.delete_devices(&owner_id).await?;

    Ok(Json(DeleteDevicesResponse {
        message: "devices deleted".to_string(),
        deleted,
    }))
}
