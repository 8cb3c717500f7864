//! Crop - Crop Records and Identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::utils::format::deserialize_optional_datetime;

/// Unique identifier for a crop
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropId(pub Arc<str>);

impl CropId {
    /// Create a new CropId from a string
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CropId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CropId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for CropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Crop lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropStatus {
    Planted,
    Growing,
    Harvested,
    Failed,
}

impl CropStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CropStatus::Planted => "planted",
            CropStatus::Growing => "growing",
            CropStatus::Harvested => "harvested",
            CropStatus::Failed => "failed",
        }
    }
}

/// A crop as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub crop_id: CropId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub planting_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub expected_harvest_date: Option<DateTime<Utc>>,
    pub status: CropStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Crop {
    /// Create a crop with only the required fields set
    pub fn new(id: impl Into<Arc<str>>, name: impl Into<String>, status: CropStatus) -> Self {
        Self {
            crop_id: CropId::new(id),
            name: name.into(),
            description: None,
            variety: None,
            planting_date: None,
            expected_harvest_date: None,
            status,
            notes: None,
        }
    }

    /// Growth stage derived from the number of days since planting
    ///
    /// Falls back to the status label when no planting date is known.
    pub fn growth_stage(&self, now: DateTime<Utc>) -> String {
        let Some(planted) = self.planting_date else {
            return self.status.label().to_string();
        };

        let days = (now - planted).num_days();
        let stage = match days {
            d if d < 7 => "Germination",
            d if d < 30 => "Seedling",
            d if d < 60 => "Vegetative",
            d if d < 90 => "Flowering",
            _ => "Mature",
        };
        stage.to_string()
    }
}
