pub mod device;
pub mod device_status;
pub mod publisher;
pub mod telemetry;

pub use device::DeviceService;
pub use device_status::DeviceStatusService;
pub use publisher::EventPublisher;
pub use telemetry::TelemetryService;
