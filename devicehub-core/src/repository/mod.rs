//! Persistence boundary
//!
//! The services only see these traits. The in-memory implementations back the
//! single-process deployment and the test suites; a relational backend plugs in
//! behind the same traits.

pub mod device;
pub mod device_status;
pub mod telemetry;

pub use device::{DeviceRepository, InMemoryDeviceRepository};
pub use device_status::{DeviceStatusRepository, InMemoryDeviceStatusRepository};
pub use telemetry::{InMemoryTelemetryRepository, TelemetryRepository};
