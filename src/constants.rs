//! Data Layer Constants
//!
//! Centralized defaults for caching, loading and debouncing. Most of these can
//! be overridden through [`crate::domain::config::AppConfig`].

/// Maximum entries per bounded cache before the oldest is evicted
pub const MAX_CACHE_SIZE: usize = 10;

/// Default number of most-recent readings fetched per analytics series
pub const DEFAULT_READING_LIMIT: usize = 50;

/// Default number of timeline events shown for a crop
pub const DEFAULT_EVENT_LIMIT: usize = 20;

/// Persistence key for the selected crop
pub const SELECTED_CROP_STORAGE_KEY: &str = "selected-crop-id";

/// Sub-load timeouts
pub const KPIS_TIMEOUT_MS: u64 = 5_000;
pub const ANALYTICS_TIMEOUT_MS: u64 = 10_000;
pub const EVENTS_TIMEOUT_MS: u64 = 5_000;
pub const METRICS_TIMEOUT_MS: u64 = 3_000;
pub const COMPARISON_TIMEOUT_MS: u64 = 5_000;

/// Overall timeout wrapping the whole dashboard fan-out
pub const OVERALL_TIMEOUT_MS: u64 = 15_000;

/// Timeout for the initial crop list load
pub const INITIAL_LOAD_TIMEOUT_MS: u64 = 10_000;

/// Quiet period before a selection change triggers a load
pub const SELECTION_DEBOUNCE_MS: u64 = 100;

/// Per-request HTTP timeout
pub const HTTP_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Capacity of the dashboard event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Health score reported for crops in good standing
pub const DEFAULT_HEALTH_SCORE: f64 = 85.0;

/// Default sustainability baseline
pub const BASELINE_WATER_SAVED_L: f64 = 150.0;
pub const BASELINE_ENERGY_SAVED_KWH: f64 = 12.0;
pub const BASELINE_CO2_REDUCTION_KG: f64 = 8.0;
pub const BASELINE_IRRIGATION_EFFICIENCY_PCT: f64 = 82.0;
