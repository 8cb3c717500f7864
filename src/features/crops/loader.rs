//! Aggregate Loader
//!
//! Builds the full [`CropDashboard`] for one crop by fanning out five
//! independent sub-loads. Each sub-load has its own time budget and falls back
//! on failure without affecting its siblings; the fan-out as a whole has an
//! overall budget past which the aggregate becomes the all-empty shape.
//!
//! ```text
//!              ┌─ kpis        (5s) ─┐
//!              ├─ analytics  (10s) ─┤
//! crop_id ─────┼─ events      (5s) ─┼──► CropDashboard   (overall 15s)
//!              ├─ metrics     (3s) ─┤
//!              └─ comparison  (5s) ─┘
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::config::{AppConfig, TimeoutConfig};
use crate::domain::crop::CropId;
use crate::domain::dashboard::{
    CropAnalytics, CropDashboard, CropKpis, SustainabilityMetrics,
};
use crate::error::FetchError;
use crate::services::{CropDataService, FetchResult, SubLoad};
use crate::state::LoadOutcome;

/// Loads dashboard aggregates through the crop data service
#[derive(Clone)]
pub struct AggregateLoader {
    service: CropDataService,
    timeouts: TimeoutConfig,
    reading_limit: usize,
    event_limit: usize,
}

impl AggregateLoader {
    pub fn new(service: CropDataService, config: &AppConfig) -> Self {
        Self {
            service,
            timeouts: config.timeouts.clone(),
            reading_limit: config.cache.reading_limit,
            event_limit: config.cache.event_limit,
        }
    }

    pub fn service(&self) -> &CropDataService {
        &self.service
    }

    /// Load the dashboard aggregate for `crop_id`
    ///
    /// Never fails: sub-load failures degrade their own field, and an overall
    /// timeout is reported once through [`LoadOutcome::failure`].
    pub async fn load_aggregate(&self, crop_id: &CropId) -> LoadOutcome {
        info!(crop_id = %crop_id, "Loading crop dashboard");
        let overall = self.timeouts.overall();

        match tokio::time::timeout(overall, self.fan_out(crop_id)).await {
            Ok((dashboard, degraded)) => {
                if degraded.is_empty() {
                    debug!(crop_id = %crop_id, "Crop dashboard loaded");
                } else {
                    let labels: Vec<&str> = degraded.iter().map(SubLoad::label).collect();
                    info!(crop_id = %crop_id, degraded = ?labels, "Crop dashboard loaded with fallbacks");
                }
                LoadOutcome {
                    crop_id: crop_id.clone(),
                    dashboard,
                    degraded,
                    failure: None,
                }
            }
            Err(_) => {
                warn!(
                    crop_id = %crop_id,
                    after_ms = overall.as_millis() as u64,
                    "Crop dashboard load timed out"
                );
                LoadOutcome {
                    crop_id: crop_id.clone(),
                    dashboard: CropDashboard::fallback(),
                    degraded: Vec::new(),
                    failure: Some(FetchError::timeout("dashboard", overall)),
                }
            }
        }
    }

    async fn fan_out(&self, crop_id: &CropId) -> (CropDashboard, Vec<SubLoad>) {
        let t = &self.timeouts;
        let (kpis, analytics, events, metrics, comparison) = futures::join!(
            sub_load(SubLoad::Kpis, t.kpis(), crop_id, self.service.crop_kpis(crop_id)),
            sub_load(
                SubLoad::Analytics,
                t.analytics(),
                crop_id,
                self.service.crop_analytics(crop_id, self.reading_limit),
            ),
            sub_load(
                SubLoad::Events,
                t.events(),
                crop_id,
                self.service.crop_events(crop_id, self.event_limit),
            ),
            sub_load(
                SubLoad::Metrics,
                t.metrics(),
                crop_id,
                self.service.sustainability_metrics(crop_id),
            ),
            sub_load(
                SubLoad::Comparison,
                t.comparison(),
                crop_id,
                self.service.crop_comparison(),
            ),
        );

        let degraded: Vec<SubLoad> = [
            (SubLoad::Kpis, kpis.is_ok()),
            (SubLoad::Analytics, analytics.is_ok()),
            (SubLoad::Events, events.is_ok()),
            (SubLoad::Metrics, metrics.is_ok()),
            (SubLoad::Comparison, comparison.is_ok()),
        ]
        .into_iter()
        .filter_map(|(load, ok)| (!ok).then_some(load))
        .collect();

        let dashboard = CropDashboard {
            kpis: kpis.unwrap_or_else(|_| CropKpis::fallback()),
            analytics: analytics.unwrap_or_else(|_| CropAnalytics::fallback()),
            events: events.unwrap_or_default(),
            metrics: metrics.unwrap_or_else(|_| SustainabilityMetrics::fallback()),
            comparison: comparison.unwrap_or_default(),
        };
        (dashboard, degraded)
    }
}

/// Run one sub-load under its own time budget, logging any fallback
async fn sub_load<T, F>(
    load: SubLoad,
    budget: Duration,
    crop_id: &CropId,
    future: F,
) -> FetchResult<T>
where
    F: Future<Output = FetchResult<T>>,
{
    match tokio::time::timeout(budget, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(
                crop_id = %crop_id,
                sub_load = load.label(),
                error = %e,
                "Sub-load failed, using fallback"
            );
            Err(e)
        }
        Err(_) => {
            let e = FetchError::timeout(load.label(), budget);
            warn!(
                crop_id = %crop_id,
                sub_load = load.label(),
                after_ms = budget.as_millis() as u64,
                "Sub-load timed out, using fallback"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crop::{Crop, CropStatus};
    use crate::domain::sensor::{Sensor, SensorReading};
    use crate::services::mock::{MockCall, MockFetcher};
    use chrono::Utc;
    use std::sync::Arc;

    fn loader(mock: MockFetcher) -> (AggregateLoader, Arc<MockFetcher>) {
        let mock = Arc::new(mock);
        let config = AppConfig::default();
        let service = CropDataService::new(mock.clone(), &config);
        (AggregateLoader::new(service, &config), mock)
    }

    fn farm() -> MockFetcher {
        MockFetcher::new()
            .with_crop(Crop::new("c1", "Tomatoes", CropStatus::Growing))
            .with_crop(Crop::new("c2", "Basil", CropStatus::Planted))
            .with_sensors(
                "c1",
                vec![
                    Sensor::new("s1", "Soil Moisture", "dev-1"),
                    Sensor::new("s2", "Temperature", "dev-1"),
                ],
            )
            .with_readings("s1", vec![SensorReading::new("s1", 41.0, Utc::now())])
            .with_readings("s2", vec![SensorReading::new("s2", 23.0, Utc::now())])
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_load() {
        let (loader, _) = loader(farm());
        let outcome = loader.load_aggregate(&CropId::from("c1")).await;

        assert!(outcome.failure.is_none());
        assert!(outcome.degraded.is_empty());
        let dashboard = outcome.dashboard;
        assert_eq!(dashboard.kpis.health_score, 85.0);
        assert_eq!(dashboard.analytics.soil_moisture.len(), 1);
        assert_eq!(dashboard.analytics.temperature.len(), 1);
        assert!(dashboard.analytics.humidity.is_empty());
        assert!(dashboard.analytics.sunlight.is_empty());
        assert_eq!(dashboard.comparison.len(), 2);
        assert_eq!(dashboard.metrics.water_saved, 150.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_failure_degrades_only_events() {
        let (loader, _) = loader(farm().with_failure(MockCall::ListActions));
        let outcome = loader.load_aggregate(&CropId::from("c1")).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.degraded, vec![SubLoad::Events]);
        assert!(outcome.dashboard.events.is_empty());
        assert_eq!(outcome.dashboard.kpis.yield_unit, "kg");
        assert_eq!(outcome.dashboard.analytics.soil_moisture.len(), 1);
        assert_eq!(outcome.dashboard.comparison.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_failure_degrades_analytics_and_events() {
        let (loader, _) = loader(farm().with_failure(MockCall::ListSensors));
        let outcome = loader.load_aggregate(&CropId::from("c1")).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.degraded, vec![SubLoad::Analytics, SubLoad::Events]);
        assert!(outcome.dashboard.analytics.is_empty());
        assert_eq!(outcome.dashboard.kpis.health_score, 85.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_kpis_time_out_independently() {
        let (loader, _) =
            loader(farm().with_delay(MockCall::GetEntity, Duration::from_secs(8)));
        let outcome = loader.load_aggregate(&CropId::from("c1")).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.degraded, vec![SubLoad::Kpis]);
        assert_eq!(outcome.dashboard.kpis, CropKpis::fallback());
        assert_eq!(outcome.dashboard.analytics.soil_moisture.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout_yields_fallback() {
        let mock = farm();
        let mock = Arc::new(mock.with_delay(MockCall::GetEntity, Duration::from_secs(60)));
        let mut config = AppConfig::default();
        // Sub-load budget larger than the overall budget
        config.timeouts.kpis_ms = 30_000;
        let service = CropDataService::new(mock.clone(), &config);
        let loader = AggregateLoader::new(service, &config);

        let outcome = loader.load_aggregate(&CropId::from("c1")).await;
        assert_eq!(outcome.dashboard, CropDashboard::fallback());
        let failure = outcome.failure.expect("overall timeout");
        assert!(failure.is_timeout());
    }
}
