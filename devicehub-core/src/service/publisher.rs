use async_trait::async_trait;

use crate::models::{DeviceStatus, Telemetry};

/// Hand-off from the ingestion path to real-time stream consumers.
///
/// This abstracts over the notification broker so that `devicehub-core` does
/// not depend on `devicehub-broker`. The implementation lives in the broker
/// crate and is wired in at startup.
///
/// Implementations must not wait for delivery to any consumer and cannot fail:
/// a record that nobody is listening for is not an error.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Called with a reading after it has been persisted
    async fn publish_telemetry(&self, telemetry: &Telemetry);

    /// Called with a status after it has been persisted
    async fn publish_status(&self, status: &DeviceStatus);
}
