//! Telemetry ingestion and query service
//!
//! Ingestion persists first and publishes second, so a stream consumer never
//! observes a reading that failed to persist.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    metrics,
    models::{CreateTelemetryRequest, DeviceId, Telemetry},
    repository::TelemetryRepository,
    service::publisher::EventPublisher,
    validation, Error, Result,
};

#[derive(Clone)]
pub struct TelemetryService {
    repo: Arc<dyn TelemetryRepository>,
    publisher: Arc<dyn EventPublisher>,
    max_history_window: Duration,
}

impl std::fmt::Debug for TelemetryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryService")
            .field("max_history_window", &self.max_history_window)
            .finish_non_exhaustive()
    }
}

impl TelemetryService {
    /// Default upper bound for history queries
    pub const DEFAULT_MAX_HISTORY_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[must_use]
    pub fn new(repo: Arc<dyn TelemetryRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repo,
            publisher,
            max_history_window: Self::DEFAULT_MAX_HISTORY_WINDOW,
        }
    }

    #[must_use]
    pub const fn with_max_history_window(mut self, window: Duration) -> Self {
        self.max_history_window = window;
        self
    }

    /// Validate, persist and publish one reading
    pub async fn ingest(&self, request: CreateTelemetryRequest) -> Result<Telemetry> {
        if let Err(e) = validation::validate_telemetry(&request) {
            metrics::ingestion::RECORDS_INGESTED
                .with_label_values(&["telemetry", "rejected"])
                .inc();
            return Err(e);
        }

        let telemetry = match self.repo.insert(request).await {
            Ok(telemetry) => telemetry,
            Err(e) => {
                warn!(error = %e, "Failed to persist telemetry, not publishing");
                metrics::ingestion::RECORDS_INGESTED
                    .with_label_values(&["telemetry", "failed"])
                    .inc();
                return Err(e);
            }
        };

        self.publisher.publish_telemetry(&telemetry).await;
        metrics::ingestion::RECORDS_INGESTED
            .with_label_values(&["telemetry", "stored"])
            .inc();

        debug!(
            device_id = %telemetry.device_id,
            telemetry_id = %telemetry.id,
            "Telemetry ingested"
        );

        Ok(telemetry)
    }

    /// Readings of the last `window`, newest first
    pub async fn history(&self, device_id: &DeviceId, window: Duration) -> Result<Vec<Telemetry>> {
        validation::validate_device_id(device_id)?;
        if window > self.max_history_window {
            return Err(Error::InvalidInput(format!(
                "duration must be at most {}",
                humantime::format_duration(self.max_history_window)
            )));
        }

        let window = chrono::Duration::from_std(window)
            .map_err(|e| Error::InvalidInput(format!("duration out of range: {e}")))?;
        let since = Utc::now()
            .checked_sub_signed(window)
            .ok_or_else(|| Error::InvalidInput("duration reaches before the earliest timestamp".to_string()))?;
        let readings = self.repo.find_since(device_id, since).await?;
        if readings.is_empty() {
            return Err(Error::NotFound(format!("no telemetry for device {device_id}")));
        }
        Ok(readings)
    }

    pub async fn latest(&self, device_id: &DeviceId) -> Result<Telemetry> {
        validation::validate_device_id(device_id)?;
        self.repo
            .find_latest(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no telemetry for device {device_id}")))
    }
}
