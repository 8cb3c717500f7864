//! Analytics - Sensor Classification and Series Formatting
//!
//! Sensors declare their type as free text ("Soil Moisture", "Temp C",
//! "Lux meter"). Classification is a case-insensitive substring match against
//! a fixed vocabulary, and each category is resolved independently: a sensor
//! typed "Soil Temp" serves both soil moisture and temperature.

use crate::domain::dashboard::{CropAnalytics, SeriesPoint};
use crate::domain::sensor::{Sensor, SensorReading};

/// Analytics series category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorCategory {
    SoilMoisture,
    Temperature,
    Humidity,
    Sunlight,
}

impl SensorCategory {
    pub const ALL: [SensorCategory; 4] = [
        SensorCategory::SoilMoisture,
        SensorCategory::Temperature,
        SensorCategory::Humidity,
        SensorCategory::Sunlight,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            SensorCategory::SoilMoisture => &["soil", "moisture"],
            SensorCategory::Temperature => &["temp"],
            SensorCategory::Humidity => &["humid"],
            SensorCategory::Sunlight => &["light", "lux"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorCategory::SoilMoisture => "soil_moisture",
            SensorCategory::Temperature => "temperature",
            SensorCategory::Humidity => "humidity",
            SensorCategory::Sunlight => "sunlight",
        }
    }

    /// Whether a declared sensor type belongs to this category
    pub fn matches(&self, sensor_type: &str) -> bool {
        let lower = sensor_type.to_lowercase();
        self.keywords().iter().any(|keyword| lower.contains(keyword))
    }

    /// First sensor of this category, in source order
    pub fn pick<'a>(&self, sensors: &'a [Sensor]) -> Option<&'a Sensor> {
        sensors.iter().find(|s| self.matches(&s.sensor_type))
    }
}

/// Normalize readings into a series sorted ascending by timestamp
///
/// Missing primary values count as zero. Ties are ordered by value so the
/// result does not depend on the order readings arrived in.
pub fn format_readings(readings: &[SensorReading]) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = readings
        .iter()
        .map(|r| SeriesPoint {
            timestamp: r.created_at,
            value: r.value1.unwrap_or(0.0),
        })
        .collect();

    points.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.value.total_cmp(&b.value))
    });
    points
}

impl CropAnalytics {
    /// Mutable access to the series of one category
    pub fn series_mut(&mut self, category: SensorCategory) -> &mut Vec<SeriesPoint> {
        match category {
            SensorCategory::SoilMoisture => &mut self.soil_moisture,
            SensorCategory::Temperature => &mut self.temperature,
            SensorCategory::Humidity => &mut self.humidity,
            SensorCategory::Sunlight => &mut self.sunlight,
        }
    }
}
