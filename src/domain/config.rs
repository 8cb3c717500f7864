//! Config - Application Configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    ANALYTICS_TIMEOUT_MS, BASELINE_CO2_REDUCTION_KG, BASELINE_ENERGY_SAVED_KWH,
    BASELINE_IRRIGATION_EFFICIENCY_PCT, BASELINE_WATER_SAVED_L, COMPARISON_TIMEOUT_MS,
    DEFAULT_EVENT_LIMIT, DEFAULT_READING_LIMIT, EVENTS_TIMEOUT_MS, HTTP_REQUEST_TIMEOUT_MS,
    INITIAL_LOAD_TIMEOUT_MS, KPIS_TIMEOUT_MS, MAX_CACHE_SIZE, METRICS_TIMEOUT_MS,
    OVERALL_TIMEOUT_MS, SELECTION_DEBOUNCE_MS,
};
use crate::domain::dashboard::SustainabilityMetrics;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Cache sizing and query bounds
    pub cache: CacheConfig,
    /// Sub-load and overall timeouts
    pub timeouts: TimeoutConfig,
    /// Selection reactor tuning
    pub reactor: ReactorConfig,
    /// Sustainability baseline
    pub metrics: MetricsConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL including the version prefix
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1".to_string(),
            request_timeout_ms: HTTP_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Cache sizing and query bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries per cache
    pub max_entries: usize,
    /// Most-recent readings fetched per analytics series
    pub reading_limit: usize,
    /// Events shown on the crop timeline
    pub event_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_CACHE_SIZE,
            reading_limit: DEFAULT_READING_LIMIT,
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub initial_load_ms: u64,
    pub kpis_ms: u64,
    pub analytics_ms: u64,
    pub events_ms: u64,
    pub metrics_ms: u64,
    pub comparison_ms: u64,
    pub overall_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            initial_load_ms: INITIAL_LOAD_TIMEOUT_MS,
            kpis_ms: KPIS_TIMEOUT_MS,
            analytics_ms: ANALYTICS_TIMEOUT_MS,
            events_ms: EVENTS_TIMEOUT_MS,
            metrics_ms: METRICS_TIMEOUT_MS,
            comparison_ms: COMPARISON_TIMEOUT_MS,
            overall_ms: OVERALL_TIMEOUT_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn initial_load(&self) -> Duration {
        Duration::from_millis(self.initial_load_ms)
    }

    pub fn kpis(&self) -> Duration {
        Duration::from_millis(self.kpis_ms)
    }

    pub fn analytics(&self) -> Duration {
        Duration::from_millis(self.analytics_ms)
    }

    pub fn events(&self) -> Duration {
        Duration::from_millis(self.events_ms)
    }

    pub fn metrics(&self) -> Duration {
        Duration::from_millis(self.metrics_ms)
    }

    pub fn comparison(&self) -> Duration {
        Duration::from_millis(self.comparison_ms)
    }

    pub fn overall(&self) -> Duration {
        Duration::from_millis(self.overall_ms)
    }
}

/// Selection reactor tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReactorConfig {
    /// Quiet period before a selection change triggers a load
    pub debounce_ms: u64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: SELECTION_DEBOUNCE_MS,
        }
    }
}

impl ReactorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Sustainability baseline reported for every crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub water_saved: f64,
    pub energy_saved: f64,
    pub co2_reduction: f64,
    pub irrigation_efficiency: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            water_saved: BASELINE_WATER_SAVED_L,
            energy_saved: BASELINE_ENERGY_SAVED_KWH,
            co2_reduction: BASELINE_CO2_REDUCTION_KG,
            irrigation_efficiency: BASELINE_IRRIGATION_EFFICIENCY_PCT,
        }
    }
}

impl From<&MetricsConfig> for SustainabilityMetrics {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            water_saved: config.water_saved,
            energy_saved: config.energy_saved,
            co2_reduction: config.co2_reduction,
            irrigation_efficiency: config.irrigation_efficiency,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily-rolling log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
