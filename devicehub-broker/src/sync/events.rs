use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use devicehub_core::models::{DeviceId, DeviceStatus, Telemetry};

/// Records fanned out to stream consumers, routed by device id.
///
/// Immutable once published; the broker shares one allocation between every
/// subscriber queue via `Arc<DeviceEvent>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A persisted sensor reading
    Telemetry(Telemetry),

    /// A persisted device status change
    StatusChanged(DeviceStatus),
}

impl DeviceEvent {
    /// Routing key
    #[must_use]
    pub const fn device_id(&self) -> &DeviceId {
        match self {
            Self::Telemetry(t) => &t.device_id,
            Self::StatusChanged(s) => &s.device_id,
        }
    }

    /// Get event type as string (for logging and metrics)
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Telemetry(_) => "telemetry",
            Self::StatusChanged(_) => "status_changed",
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Telemetry(t) => t.created_at,
            Self::StatusChanged(s) => s.time,
        }
    }
}

impl From<Telemetry> for DeviceEvent {
    fn from(telemetry: Telemetry) -> Self {
        Self::Telemetry(telemetry)
    }
}

impl From<DeviceStatus> for DeviceEvent {
    fn from(status: DeviceStatus) -> Self {
        Self::StatusChanged(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicehub_core::models::TelemetryId;

    #[test]
    fn test_status_event_wire_shape() {
        let event = DeviceEvent::StatusChanged(DeviceStatus {
            device_id: DeviceId::from("dev-1"),
            status: "online".to_string(),
            time: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["device_id"], "dev-1");
        assert_eq!(json["status"], "online");
        assert_eq!(event.event_type(), "status_changed");
    }

    #[test]
    fn test_telemetry_event_routing_key() {
        let now = Utc::now();
        let event = DeviceEvent::from(Telemetry {
            id: TelemetryId::new(),
            device_id: DeviceId::from("dev-7"),
            ppm: 550.0,
            water_level_on_plant: 0.0,
            water_level_on_condenser: 0.0,
            water_level_on_nutrient_tank: 0.0,
            humidity: 0.0,
            created_at: now,
        });

        assert_eq!(event.device_id().as_str(), "dev-7");
        assert_eq!(event.timestamp(), now);

        let parsed: DeviceEvent = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(parsed, event);
    }
}
