//! Service wiring

use std::sync::Arc;

use crate::{
    repository::{InMemoryDeviceRepository, InMemoryDeviceStatusRepository, InMemoryTelemetryRepository},
    service::{DeviceService, DeviceStatusService, EventPublisher, TelemetryService},
    Config,
};

/// Ingestion and query services shared by the HTTP layer
#[derive(Clone, Debug)]
pub struct Services {
    pub telemetry_service: TelemetryService,
    pub device_status_service: DeviceStatusService,
    pub device_service: DeviceService,
}

/// Build the services on the in-memory repositories, publishing through `publisher`
pub fn init_services(config: &Config, publisher: Arc<dyn EventPublisher>) -> anyhow::Result<Services> {
    let max_history_window = config
        .telemetry
        .max_history_window()
        .map_err(|e| anyhow::anyhow!("Invalid telemetry.max_history_window: {e}"))?;

    let telemetry_service = TelemetryService::new(
        Arc::new(InMemoryTelemetryRepository::new()),
        publisher.clone(),
    )
    .with_max_history_window(max_history_window);

    let device_service = DeviceService::new(Arc::new(InMemoryDeviceRepository::new()));

    let mut device_status_service =
        DeviceStatusService::new(Arc::new(InMemoryDeviceStatusRepository::new()), publisher);
    if config.devices.require_registration {
        device_status_service = device_status_service.with_registry(device_service.clone());
    }

    tracing::info!(
        require_registration = config.devices.require_registration,
        "Services initialized (in-memory repositories)"
    );

    Ok(Services {
        telemetry_service,
        device_status_service,
        device_service,
    })
}
