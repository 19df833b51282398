use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::DeviceId;

/// A registered device and the account that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub device_id: DeviceId,
    pub device_name: String,
    pub owner_id: String,
}

/// Rename request; only the owner may rename a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDeviceRequest {
    pub owner_id: String,
    pub device_name: String,
}

/// Last reported status of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: DeviceId,
    pub status: String,
    pub time: DateTime<Utc>,
}

/// Status report sent by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub device_id: DeviceId,
    pub status: String,
}
