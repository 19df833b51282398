use async_trait::async_trait;

use devicehub_core::models::{DeviceStatus, Telemetry};
use devicehub_core::service::EventPublisher;

use super::broker::Broker;

#[async_trait]
impl EventPublisher for Broker {
    async fn publish_telemetry(&self, telemetry: &Telemetry) {
        self.publish(telemetry.clone()).await;
    }

    async fn publish_status(&self, status: &DeviceStatus) {
        self.publish(status.clone()).await;
    }
}
