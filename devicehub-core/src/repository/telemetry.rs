use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::{
    models::{CreateTelemetryRequest, DeviceId, Telemetry, TelemetryId},
    Result,
};

/// Telemetry storage
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Persist a reading, assigning its id and creation time
    async fn insert(&self, request: CreateTelemetryRequest) -> Result<Telemetry>;

    /// Readings created at or after `since`, newest first
    async fn find_since(&self, device_id: &DeviceId, since: DateTime<Utc>)
        -> Result<Vec<Telemetry>>;

    /// Most recent reading of a device
    async fn find_latest(&self, device_id: &DeviceId) -> Result<Option<Telemetry>>;
}

/// `DashMap`-backed telemetry store, readings kept per device in insertion order
#[derive(Clone, Default)]
pub struct InMemoryTelemetryRepository {
    readings: Arc<DashMap<DeviceId, Vec<Telemetry>>>,
}

impl InMemoryTelemetryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored readings
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.iter().map(|entry| entry.value().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TelemetryRepository for InMemoryTelemetryRepository {
    async fn insert(&self, request: CreateTelemetryRequest) -> Result<Telemetry> {
        let telemetry = request.into_telemetry(TelemetryId::new(), Utc::now());
        self.readings
            .entry(telemetry.device_id.clone())
            .or_default()
            .push(telemetry.clone());
        Ok(telemetry)
    }

    async fn find_since(
        &self,
        device_id: &DeviceId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Telemetry>> {
        Ok(self
            .readings
            .get(device_id)
            .map(|readings| {
                readings
                    .iter()
                    .rev()
                    .filter(|t| t.created_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_latest(&self, device_id: &DeviceId) -> Result<Option<Telemetry>> {
        Ok(self
            .readings
            .get(device_id)
            .and_then(|readings| readings.last().cloned()))
    }
}
