use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{DeviceId, TelemetryId};

/// One persisted sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub id: TelemetryId,
    pub device_id: DeviceId,
    pub ppm: f64,
    pub water_level_on_plant: f64,
    pub water_level_on_condenser: f64,
    pub water_level_on_nutrient_tank: f64,
    pub humidity: f64,
    pub created_at: DateTime<Utc>,
}

/// Reading as submitted by a device, before persistence assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTelemetryRequest {
    pub device_id: DeviceId,
    #[serde(default)]
    pub ppm: f64,
    #[serde(default)]
    pub water_level_on_plant: f64,
    #[serde(default)]
    pub water_level_on_condenser: f64,
    #[serde(default)]
    pub water_level_on_nutrient_tank: f64,
    #[serde(default)]
    pub humidity: f64,
}

impl CreateTelemetryRequest {
    /// Readings in field order, paired with their wire names
    #[must_use]
    pub fn readings(&self) -> [(&'static str, f64); 5] {
        [
            ("ppm", self.ppm),
            ("water_level_on_plant", self.water_level_on_plant),
            ("water_level_on_condenser", self.water_level_on_condenser),
            ("water_level_on_nutrient_tank", self.water_level_on_nutrient_tank),
            ("humidity", self.humidity),
        ]
    }

    /// Materialize the stored record
    #[must_use]
    pub fn into_telemetry(self, id: TelemetryId, created_at: DateTime<Utc>) -> Telemetry {
        Telemetry {
            id,
            device_id: self.device_id,
            ppm: self.ppm,
            water_level_on_plant: self.water_level_on_plant,
            water_level_on_condenser: self.water_level_on_condenser,
            water_level_on_nutrient_tank: self.water_level_on_nutrient_tank,
            humidity: self.humidity,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_readings_default_to_zero() {
        let req: CreateTelemetryRequest =
            serde_json::from_str(r#"{"device_id":"dev-1","ppm":550.0}"#).unwrap();
        assert_eq!(req.ppm, 550.0);
        assert_eq!(req.humidity, 0.0);
    }

    #[test]
    fn test_missing_device_id_is_rejected() {
        let result: Result<CreateTelemetryRequest, _> = serde_json::from_str(r#"{"ppm":550.0}"#);
        assert!(result.is_err());
    }
}
