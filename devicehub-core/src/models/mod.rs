pub mod device;
pub mod id;
pub mod telemetry;

pub use device::{CreateDeviceRequest, Device, DeviceStatus, UpdateDeviceRequest, UpdateStatusRequest};
pub use id::{DeviceId, TelemetryId};
pub use telemetry::{CreateTelemetryRequest, Telemetry};
