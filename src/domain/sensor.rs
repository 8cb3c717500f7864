//! Sensor - Sensor Records and Readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::crop::CropId;

/// A sensor attached to a device and optionally to a crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    #[serde(default)]
    pub id: i64,
    pub sensor_id: String,
    #[serde(default)]
    pub farm_id: String,
    /// Free-form declared type, e.g. "Soil Moisture" or "Temp C"
    #[serde(rename = "type")]
    pub sensor_type: String,
    #[serde(default)]
    pub unit: String,
    pub device_id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub crop_id: Option<CropId>,
    #[serde(default)]
    pub min_critical: Option<f64>,
    #[serde(default)]
    pub min_warning: Option<f64>,
    #[serde(default)]
    pub max_warning: Option<f64>,
    #[serde(default)]
    pub max_critical: Option<f64>,
    #[serde(default)]
    pub action_low: Option<String>,
    #[serde(default)]
    pub action_high: Option<String>,
    /// Only populated when requested with `include_readings`
    #[serde(default)]
    pub readings: Option<Vec<SensorReading>>,
}

impl Sensor {
    /// Create a sensor with only the required fields set
    pub fn new(
        sensor_id: impl Into<String>,
        sensor_type: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            sensor_id: sensor_id.into(),
            farm_id: String::new(),
            sensor_type: sensor_type.into(),
            unit: String::new(),
            device_id: device_id.into(),
            location: None,
            crop_id: None,
            min_critical: None,
            min_warning: None,
            max_warning: None,
            max_critical: None,
            action_low: None,
            action_high: None,
            readings: None,
        }
    }
}

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sensor_id: String,
    #[serde(default)]
    pub value1: Option<f64>,
    #[serde(default)]
    pub value2: Option<f64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl SensorReading {
    /// Create a reading carrying a primary value
    pub fn new(sensor_id: impl Into<String>, value1: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            sensor_id: sensor_id.into(),
            value1: Some(value1),
            value2: None,
            created_at,
        }
    }
}
