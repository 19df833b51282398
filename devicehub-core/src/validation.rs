//! Input validation for ingested records

use crate::{
    models::{CreateDeviceRequest, CreateTelemetryRequest, DeviceId, UpdateStatusRequest},
    Error, Result,
};

/// Longest accepted device identifier
pub const MAX_DEVICE_ID_LEN: usize = 64;
/// Longest accepted status string
pub const MAX_STATUS_LEN: usize = 32;
/// Longest accepted device display name
pub const MAX_DEVICE_NAME_LEN: usize = 128;

pub fn validate_device_id(device_id: &DeviceId) -> Result<()> {
    if !device_id.is_valid() {
        return Err(Error::InvalidInput("device_id must not be empty".to_string()));
    }
    if device_id.as_str().len() > MAX_DEVICE_ID_LEN {
        return Err(Error::InvalidInput(format!(
            "device_id must be at most {MAX_DEVICE_ID_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_telemetry(request: &CreateTelemetryRequest) -> Result<()> {
    validate_device_id(&request.device_id)?;
    for (name, value) in request.readings() {
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!("{name} must be a finite number")));
        }
    }
    Ok(())
}

pub fn validate_status(request: &UpdateStatusRequest) -> Result<()> {
    validate_device_id(&request.device_id)?;
    let status = request.status.trim();
    if status.is_empty() {
        return Err(Error::InvalidInput("status must not be empty".to_string()));
    }
    if status.len() > MAX_STATUS_LEN {
        return Err(Error::InvalidInput(format!(
            "status must be at most {MAX_STATUS_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_owner_id(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(Error::InvalidInput("owner_id must not be empty".to_string()));
    }
    Ok(())
}

pub fn validate_device_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("device_name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_DEVICE_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "device_name must be at most {MAX_DEVICE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_device(request: &CreateDeviceRequest) -> Result<()> {
    validate_device_id(&request.device_id)?;
    validate_device_name(&request.device_name)?;
    validate_owner_id(&request.owner_id)
}
