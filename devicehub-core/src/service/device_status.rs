use std::sync::Arc;
use tracing::info;

use crate::{
    metrics,
    models::{DeviceId, DeviceStatus, UpdateStatusRequest},
    repository::DeviceStatusRepository,
    service::{publisher::EventPublisher, DeviceService},
    validation, Error, Result,
};

/// Device status updates, persisted then pushed to stream consumers
#[derive(Clone)]
pub struct DeviceStatusService {
    repo: Arc<dyn DeviceStatusRepository>,
    publisher: Arc<dyn EventPublisher>,
    registry: Option<DeviceService>,
}

impl std::fmt::Debug for DeviceStatusService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStatusService")
            .field("requires_registration", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl DeviceStatusService {
    #[must_use]
    pub fn new(repo: Arc<dyn DeviceStatusRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repo,
            publisher,
            registry: None,
        }
    }

    /// Only accept status reports from devices registered in `registry`
    #[must_use]
    pub fn with_registry(mut self, registry: DeviceService) -> Self {
        self.registry = Some(registry);
        self
    }

    pub async fn update_status(&self, request: UpdateStatusRequest) -> Result<DeviceStatus> {
        if let Err(e) = self.check(&request).await {
            metrics::ingestion::RECORDS_INGESTED
                .with_label_values(&["status", "rejected"])
                .inc();
            return Err(e);
        }

        let status = self
            .repo
            .upsert(&request.device_id, request.status.trim())
            .await
            .inspect_err(|_| {
                metrics::ingestion::RECORDS_INGESTED
                    .with_label_values(&["status", "failed"])
                    .inc();
            })?;

        self.publisher.publish_status(&status).await;
        metrics::ingestion::RECORDS_INGESTED
            .with_label_values(&["status", "stored"])
            .inc();

        info!(
            device_id = %status.device_id,
            status = %status.status,
            "Device status updated"
        );

        Ok(status)
    }

    async fn check(&self, request: &UpdateStatusRequest) -> Result<()> {
        validation::validate_status(request)?;
        if let Some(registry) = &self.registry {
            registry.ensure_registered(&request.device_id).await?;
        }
        Ok(())
    }

    pub async fn get_status(&self, device_id: &DeviceId) -> Result<DeviceStatus> {
        validation::validate_device_id(device_id)?;
        self.repo
            .get(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no status for device {device_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Telemetry;
    use crate::models::CreateDeviceRequest;
    use crate::repository::{InMemoryDeviceRepository, InMemoryDeviceStatusRepository};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        statuses: Mutex<Vec<DeviceStatus>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish_telemetry(&self, _telemetry: &Telemetry) {}

        async fn publish_status(&self, status: &DeviceStatus) {
            self.statuses.lock().unwrap().push(status.clone());
        }
    }

    #[tokio::test]
    async fn test_update_status_persists_and_publishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let service = DeviceStatusService::new(
            Arc::new(InMemoryDeviceStatusRepository::new()),
            publisher.clone(),
        );

        let status = service
            .update_status(UpdateStatusRequest {
                device_id: DeviceId::from("dev-1"),
                status: " online ".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(status.status, "online");
        assert_eq!(service.get_status(&DeviceId::from("dev-1")).await.unwrap(), status);
        assert_eq!(publisher.statuses.lock().unwrap().as_slice(), &[status]);
    }

    #[tokio::test]
    async fn test_rejected_status_is_not_published() {
        let publisher = Arc::new(RecordingPublisher::default());
        let service = DeviceStatusService::new(
            Arc::new(InMemoryDeviceStatusRepository::new()),
            publisher.clone(),
        );

        let result = service
            .update_status(UpdateStatusRequest {
                device_id: DeviceId::from("dev-1"),
                status: String::new(),
            })
            .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(publisher.statuses.lock().unwrap().is_empty());
        assert!(matches!(
            service.get_status(&DeviceId::from("dev-1")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_device_is_rejected() {
        let publisher = Arc::new(RecordingPublisher::default());
        let registry = DeviceService::new(Arc::new(InMemoryDeviceRepository::new()));
        let service = DeviceStatusService::new(
            Arc::new(InMemoryDeviceStatusRepository::new()),
            publisher.clone(),
        )
        .with_registry(registry.clone());
        let report = UpdateStatusRequest {
            device_id: DeviceId::from("dev-1"),
            status: "online".to_string(),
        };

        let result = service.update_status(report.clone()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(publisher.statuses.lock().unwrap().is_empty());

        registry
            .create_device(CreateDeviceRequest {
                device_id: DeviceId::from("dev-1"),
                device_name: "Greenhouse".to_string(),
                owner_id: "alice".to_string(),
            })
            .await
            .unwrap();
        service.update_status(report).await.unwrap();
        assert_eq!(publisher.statuses.lock().unwrap().len(), 1);
    }
}
