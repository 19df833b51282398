use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::{
    models::{DeviceId, DeviceStatus},
    Result,
};

/// Latest-status storage, one row per device
#[async_trait]
pub trait DeviceStatusRepository: Send + Sync {
    /// Insert or replace the status of a device, stamping the update time
    async fn upsert(&self, device_id: &DeviceId, status: &str) -> Result<DeviceStatus>;

    async fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceStatus>>;
}

#[derive(Clone, Default)]
pub struct InMemoryDeviceStatusRepository {
    statuses: Arc<DashMap<DeviceId, DeviceStatus>>,
}

impl InMemoryDeviceStatusRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStatusRepository for InMemoryDeviceStatusRepository {
    async fn upsert(&self, device_id: &DeviceId, status: &str) -> Result<DeviceStatus> {
        let record = DeviceStatus {
            device_id: device_id.clone(),
            status: status.to_string(),
            time: Utc::now(),
        };
        self.statuses.insert(device_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceStatus>> {
        Ok(self.statuses.get(device_id).map(|s| s.value().clone()))
    }
}
