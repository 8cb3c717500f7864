//! Crop Dashboard Library
//!
//! Selection-driven data loading for a farm crop monitoring dashboard: a
//! bounded cache and request deduplicator in front of the backend, an
//! aggregate loader with per-part timeouts and fallbacks, and a reactor that
//! turns crop selections into debounced, stale-safe dashboard loads.

pub mod constants;
pub mod domain;
pub mod error;
pub mod features;
pub mod helpers;
pub mod services;
pub mod state;
pub mod utils;
