//! Dashboard - Aggregate View Model for a Selected Crop
//!
//! Every field has a well-defined fallback so that a failed sub-load degrades
//! only its own field and the aggregate always keeps its full shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_HEALTH_SCORE;
use crate::domain::action::{ActionLog, ActionStatus};
use crate::domain::crop::{Crop, CropId, CropStatus};

/// Headline indicators for a crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropKpis {
    pub yield_amount: f64,
    pub yield_unit: String,
    pub growth_stage: String,
    pub irrigation_status: String,
    pub health_score: f64,
}

impl CropKpis {
    /// Derive KPIs from the crop record
    pub fn from_crop(crop: &Crop, now: DateTime<Utc>) -> Self {
        let health_score = match crop.status {
            CropStatus::Planted | CropStatus::Growing => DEFAULT_HEALTH_SCORE,
            CropStatus::Harvested => 100.0,
            CropStatus::Failed => 0.0,
        };
        Self {
            yield_amount: 0.0,
            yield_unit: "kg".to_string(),
            growth_stage: crop.growth_stage(now),
            irrigation_status: "Active".to_string(),
            health_score,
        }
    }

    pub fn fallback() -> Self {
        Self {
            yield_amount: 0.0,
            yield_unit: "kg".to_string(),
            growth_stage: "unknown".to_string(),
            irrigation_status: "Unknown".to_string(),
            health_score: 0.0,
        }
    }
}

/// One point of an analytics series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time series per sensor category, each sorted ascending by timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropAnalytics {
    pub soil_moisture: Vec<SeriesPoint>,
    pub temperature: Vec<SeriesPoint>,
    pub humidity: Vec<SeriesPoint>,
    pub sunlight: Vec<SeriesPoint>,
}

impl CropAnalytics {
    pub fn fallback() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.soil_moisture.is_empty()
            && self.temperature.is_empty()
            && self.humidity.is_empty()
            && self.sunlight.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropEventKind {
    Irrigation,
    Fertilizer,
    Disease,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropEventStatus {
    Success,
    Warning,
    Error,
}

/// A timeline entry for a crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: CropEventKind,
    pub description: String,
    pub status: CropEventStatus,
}

impl From<&ActionLog> for CropEvent {
    fn from(log: &ActionLog) -> Self {
        let uri = log.action_uri.to_lowercase();
        let kind = if uri.contains("irrigat") {
            CropEventKind::Irrigation
        } else if uri.contains("fertil") {
            CropEventKind::Fertilizer
        } else if log.violation_type.is_some() {
            CropEventKind::Disease
        } else {
            CropEventKind::Action
        };

        let status = match log.status {
            ActionStatus::Ack | ActionStatus::Sent => CropEventStatus::Success,
            ActionStatus::Queued | ActionStatus::Unknown => CropEventStatus::Warning,
            ActionStatus::Error | ActionStatus::Timeout | ActionStatus::Failed => {
                CropEventStatus::Error
            }
        };

        let description = match &log.error_message {
            Some(err) if status == CropEventStatus::Error => {
                format!("{} on {}: {}", log.action_uri, log.device_id, err)
            }
            _ => format!("{} on {}", log.action_uri, log.device_id),
        };

        Self {
            id: log.id.clone(),
            timestamp: log.created_at,
            kind,
            description,
            status,
        }
    }
}

/// Resource savings attributed to smart irrigation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityMetrics {
    /// Litres
    pub water_saved: f64,
    /// kWh
    pub energy_saved: f64,
    /// kg
    pub co2_reduction: f64,
    /// Percent
    pub irrigation_efficiency: f64,
}

impl SustainabilityMetrics {
    pub fn fallback() -> Self {
        Self {
            water_saved: 0.0,
            energy_saved: 0.0,
            co2_reduction: 0.0,
            irrigation_efficiency: 0.0,
        }
    }
}

/// One row of the cross-crop comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub crop_id: CropId,
    pub name: String,
    pub status: CropStatus,
    pub planted: Option<DateTime<Utc>>,
    pub expected_harvest: Option<DateTime<Utc>>,
}

impl From<&Crop> for ComparisonRow {
    fn from(crop: &Crop) -> Self {
        Self {
            crop_id: crop.crop_id.clone(),
            name: crop.name.clone(),
            status: crop.status,
            planted: crop.planting_date,
            expected_harvest: crop.expected_harvest_date,
        }
    }
}

/// The full dashboard aggregate for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropDashboard {
    pub kpis: CropKpis,
    pub analytics: CropAnalytics,
    pub events: Vec<CropEvent>,
    pub metrics: SustainabilityMetrics,
    pub comparison: Vec<ComparisonRow>,
}

impl CropDashboard {
    /// The all-empty shape used when the whole load fails
    pub fn fallback() -> Self {
        Self {
            kpis: CropKpis::fallback(),
            analytics: CropAnalytics::fallback(),
            events: Vec::new(),
            metrics: SustainabilityMetrics::fallback(),
            comparison: Vec::new(),
        }
    }
}
