//! Crop Data Service
//!
//! Per-process data access for the crop dashboard. Composes the bounded
//! caches (settled, replayable results) with request deduplication (no
//! duplicate calls while pending) in front of a [`Fetcher`].
//!
//! Failed fetches are cached exactly like successes and there is no TTL; the
//! caches live until [`CropDataService::clear_caches`] is called on teardown.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::action::{ActionAck, ActionContext, ActionFilter, ExecuteActionRequest};
use crate::domain::analytics::{SensorCategory, format_readings};
use crate::domain::config::{AppConfig, CacheConfig};
use crate::domain::crop::{Crop, CropId};
use crate::domain::dashboard::{
    ComparisonRow, CropAnalytics, CropEvent, CropKpis, SustainabilityMetrics,
};
use crate::domain::sensor::{Sensor, SensorReading};
use crate::error::{Error, FetchError, Result};
use crate::helpers::BoundedCache;
use crate::services::dedup::RequestDeduplicator;
use crate::services::fetcher::{FetchResult, Fetcher, SharedResult};

const CROPS_KEY: &str = "crops";

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    cache_config: CacheConfig,
    metrics: SustainabilityMetrics,

    crops: Mutex<Option<SharedResult<Vec<Crop>>>>,
    crops_requests: RequestDeduplicator<Vec<Crop>>,

    sensors: Mutex<BoundedCache<String, SharedResult<Vec<Sensor>>>>,
    sensors_requests: RequestDeduplicator<Vec<Sensor>>,

    readings: Mutex<BoundedCache<String, SharedResult<Vec<SensorReading>>>>,
    readings_requests: RequestDeduplicator<Vec<SensorReading>>,

    analytics_requests: RequestDeduplicator<CropAnalytics>,
}

/// Snapshot of cache occupancy, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub crops_cached: bool,
    pub sensors: usize,
    pub readings: usize,
    pub in_flight: usize,
}

/// Cached and deduplicated access to crop data
#[derive(Clone)]
pub struct CropDataService {
    inner: Arc<Inner>,
}

impl CropDataService {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Self {
        let max_entries = config.cache.max_entries;
        Self {
            inner: Arc::new(Inner {
                fetcher,
                cache_config: config.cache.clone(),
                metrics: SustainabilityMetrics::from(&config.metrics),
                crops: Mutex::new(None),
                crops_requests: RequestDeduplicator::new(),
                sensors: Mutex::new(BoundedCache::new(max_entries)),
                sensors_requests: RequestDeduplicator::new(),
                readings: Mutex::new(BoundedCache::new(max_entries)),
                readings_requests: RequestDeduplicator::new(),
                analytics_requests: RequestDeduplicator::new(),
            }),
        }
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.inner.cache_config
    }

    // ==================== Crops ====================

    /// The crop list, fetched once and cached
    pub fn crops(&self) -> SharedResult<Vec<Crop>> {
        let mut cached = self.inner.crops.lock();
        if let Some(crops) = cached.as_ref() {
            return crops.clone();
        }

        let fetcher = self.inner.fetcher.clone();
        let crops = self
            .inner
            .crops_requests
            .get_or_fetch(CROPS_KEY, move || async move { fetcher.list_entities().await });
        *cached = Some(crops.clone());
        crops
    }

    /// KPIs derived from a fresh crop record
    pub async fn crop_kpis(&self, crop_id: &CropId) -> FetchResult<CropKpis> {
        let crop = self.inner.fetcher.get_entity(crop_id).await?;
        Ok(CropKpis::from_crop(&crop, Utc::now()))
    }

    /// One comparison row per known crop
    pub async fn crop_comparison(&self) -> FetchResult<Vec<ComparisonRow>> {
        let crops = self.crops().await?;
        Ok(crops.iter().map(ComparisonRow::from).collect())
    }

    /// Sustainability baseline for a crop
    pub async fn sustainability_metrics(
        &self,
        crop_id: &CropId,
    ) -> FetchResult<SustainabilityMetrics> {
        debug!(crop_id = %crop_id, "Using configured sustainability baseline");
        Ok(self.inner.metrics)
    }

    // ==================== Sensors & Readings ====================

    /// Sensors of a crop, cached under `sensors_{crop_id}`
    pub fn crop_sensors(&self, crop_id: &CropId) -> SharedResult<Vec<Sensor>> {
        let key = format!("sensors_{crop_id}");
        let mut cache = self.inner.sensors.lock();
        cache.get_or_create(key.clone(), || {
            let fetcher = self.inner.fetcher.clone();
            let crop_id = crop_id.clone();
            self.inner.sensors_requests.get_or_fetch(&key, move || async move {
                fetcher.list_sensors_for_entity(&crop_id, false).await
            })
        })
    }

    /// Readings of a sensor, cached under `readings_{sensor_id}_{limit}_{offset}`
    pub fn sensor_readings(
        &self,
        sensor_id: &str,
        limit: usize,
        offset: usize,
    ) -> SharedResult<Vec<SensorReading>> {
        let key = format!("readings_{sensor_id}_{limit}_{offset}");
        let mut cache = self.inner.readings.lock();
        cache.get_or_create(key.clone(), || {
            let fetcher = self.inner.fetcher.clone();
            let sensor_id = sensor_id.to_string();
            self.inner.readings_requests.get_or_fetch(&key, move || async move {
                fetcher.get_readings(&sensor_id, limit, offset).await
            })
        })
    }

    // ==================== Analytics ====================

    /// Per-category reading series for a crop, deduplicated under
    /// `analytics_{crop_id}_{limit}`
    pub fn crop_analytics(&self, crop_id: &CropId, limit: usize) -> SharedResult<CropAnalytics> {
        let key = format!("analytics_{crop_id}_{limit}");
        let service = self.clone();
        let crop_id = crop_id.clone();
        self.inner.analytics_requests.get_or_fetch(&key, move || async move {
            service.build_analytics(&crop_id, limit).await
        })
    }

    async fn build_analytics(&self, crop_id: &CropId, limit: usize) -> FetchResult<CropAnalytics> {
        let sensors = self.crop_sensors(crop_id).await?;

        let queries = SensorCategory::ALL.into_iter().filter_map(|category| {
            let sensor = category.pick(&sensors)?;
            let sensor_id = sensor.sensor_id.clone();
            let readings = self.sensor_readings(&sensor_id, limit, 0);
            Some(async move {
                let points = match readings.await {
                    Ok(readings) => format_readings(&readings),
                    Err(e) => {
                        warn!(
                            sensor_id = %sensor_id,
                            category = category.label(),
                            error = %e,
                            "Reading query failed, using empty series"
                        );
                        Vec::new()
                    }
                };
                (category, points)
            })
        });

        let mut analytics = CropAnalytics::default();
        for (category, points) in join_all(queries).await {
            *analytics.series_mut(category) = points;
        }

        debug!(
            crop_id = %crop_id,
            soil_moisture = analytics.soil_moisture.len(),
            temperature = analytics.temperature.len(),
            humidity = analytics.humidity.len(),
            sunlight = analytics.sunlight.len(),
            "Analytics assembled"
        );
        Ok(analytics)
    }

    // ==================== Events ====================

    /// Most recent action log entries across the crop's sensors, newest first
    ///
    /// Sensors whose query fails are skipped. Fails only when the crop has
    /// sensors and every query failed.
    pub async fn crop_events(&self, crop_id: &CropId, limit: usize) -> FetchResult<Vec<CropEvent>> {
        let sensors = self.crop_sensors(crop_id).await?;

        let pages = sensors.iter().map(|sensor| {
            let fetcher = self.inner.fetcher.clone();
            let filter = ActionFilter::for_sensor(sensor.sensor_id.clone(), limit);
            async move {
                let page = fetcher.list_actions(&filter).await;
                (filter, page)
            }
        });

        let mut logs = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;
        for (filter, page) in join_all(pages).await {
            match page {
                Ok(page) => {
                    succeeded += 1;
                    logs.extend(page.items);
                }
                Err(e) => {
                    warn!(
                        sensor_id = ?filter.sensor_id,
                        error = %e,
                        "Action log query failed, skipping sensor"
                    );
                    last_error = Some(e);
                }
            }
        }
        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(FetchError::transient(format!(
                    "all {} action log queries failed for crop {crop_id}: {e}",
                    sensors.len()
                )));
            }
        }

        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs.iter().map(CropEvent::from).collect())
    }

    // ==================== Actions ====================

    /// Execute a device action on behalf of a crop
    ///
    /// The action targets the device of the crop's first sensor. A crop with
    /// no sensors is rejected without calling the backend.
    pub async fn execute_action(&self, crop_id: &CropId, action: &str) -> Result<ActionAck> {
        let sensors = self.crop_sensors(crop_id).await?;
        let Some(sensor) = sensors.first() else {
            warn!(crop_id = %crop_id, action = %action, "No sensors found for crop");
            return Err(Error::NoSensors {
                crop_id: crop_id.to_string(),
            });
        };

        let request = ExecuteActionRequest::new(sensor.device_id.clone(), action).with_context(
            ActionContext {
                sensor_id: Some(sensor.sensor_id.clone()),
                sensor_type: Some(sensor.sensor_type.clone()),
            },
        );
        info!(
            crop_id = %crop_id,
            device_id = %request.device_id,
            action = %action,
            action_id = %request.action_id,
            "Executing action"
        );

        Ok(self.inner.fetcher.execute_action(&request).await?)
    }

    // ==================== Lifecycle ====================

    /// Drop every cached and in-flight record
    pub fn clear_caches(&self) {
        *self.inner.crops.lock() = None;
        self.inner.sensors.lock().clear();
        self.inner.readings.lock().clear();
        self.inner.crops_requests.clear();
        self.inner.sensors_requests.clear();
        self.inner.readings_requests.clear();
        self.inner.analytics_requests.clear();
        debug!("Crop data caches cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            crops_cached: self.inner.crops.lock().is_some(),
            sensors: self.inner.sensors.lock().len(),
            readings: self.inner.readings.lock().len(),
            in_flight: self.inner.crops_requests.in_flight_count()
                + self.inner.sensors_requests.in_flight_count()
                + self.inner.readings_requests.in_flight_count()
                + self.inner.analytics_requests.in_flight_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionLog, ActionStatus, TriggerSource};
    use crate::domain::crop::CropStatus;
    use crate::services::mock::{MockCall, MockFetcher};
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::time::Duration;

    fn service(mock: &Arc<MockFetcher>) -> CropDataService {
        CropDataService::new(mock.clone(), &AppConfig::default())
    }

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0)
            .single()
            .expect("time")
    }

    fn log(id: &str, sensor_id: &str, minutes: i64) -> ActionLog {
        ActionLog {
            id: id.into(),
            created_at: base_time() + ChronoDuration::minutes(minutes),
            trigger_source: TriggerSource::Manual,
            device_id: "dev-1".into(),
            sensor_id: Some(sensor_id.into()),
            sensor_type: None,
            value: None,
            unit: None,
            violation_type: None,
            action_uri: "mqtt:/pump/irrigation_on".into(),
            status: ActionStatus::Ack,
            error_message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensors_cached_and_deduplicated() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors("c1", vec![Sensor::new("s1", "Soil", "dev-1")])
                .with_delay(MockCall::ListSensors, Duration::from_millis(50)),
        );
        let service = service(&mock);
        let crop = CropId::from("c1");

        let (a, b) = futures::join!(service.crop_sensors(&crop), service.crop_sensors(&crop));
        assert_eq!(a.expect("sensors").len(), 1);
        assert_eq!(b.expect("sensors").len(), 1);

        let again = service.crop_sensors(&crop).await.expect("sensors");
        assert_eq!(again[0].sensor_id, "s1");
        assert_eq!(mock.calls(MockCall::ListSensors), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_cached() {
        let mock = Arc::new(MockFetcher::new().with_failure(MockCall::ListEntities));
        let service = service(&mock);

        assert!(service.crops().await.is_err());
        assert!(service.crops().await.is_err());
        assert_eq!(mock.calls(MockCall::ListEntities), 1);

        service.clear_caches();
        assert!(service.crops().await.is_err());
        assert_eq!(mock.calls(MockCall::ListEntities), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analytics_soil_and_temperature() {
        let t = base_time();
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors(
                    "c1",
                    vec![
                        Sensor::new("s1", "Soil Moisture", "dev-1"),
                        Sensor::new("s2", "Temp C", "dev-1"),
                    ],
                )
                .with_readings(
                    "s1",
                    vec![
                        SensorReading::new("s1", 30.0, t + ChronoDuration::minutes(1)),
                        SensorReading::new("s1", 25.0, t),
                    ],
                )
                .with_readings("s2", vec![SensorReading::new("s2", 21.5, t)]),
        );
        let service = service(&mock);

        let analytics = service
            .crop_analytics(&CropId::from("c1"), 2)
            .await
            .expect("analytics");

        let soil: Vec<f64> = analytics.soil_moisture.iter().map(|p| p.value).collect();
        assert_eq!(soil, vec![25.0, 30.0]);
        assert_eq!(analytics.temperature.len(), 1);
        assert!(analytics.humidity.is_empty());
        assert!(analytics.sunlight.is_empty());
        assert_eq!(mock.calls(MockCall::GetReadings), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analytics_failed_reading_yields_empty_series() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors(
                    "c1",
                    vec![
                        Sensor::new("s1", "Humidity", "dev-1"),
                        Sensor::new("s2", "Light", "dev-1"),
                    ],
                )
                .with_readings("s2", vec![SensorReading::new("s2", 800.0, base_time())])
                .with_keyed_failure(MockCall::GetReadings, "s1"),
        );
        let service = service(&mock);

        let analytics = service
            .crop_analytics(&CropId::from("c1"), 50)
            .await
            .expect("analytics");
        assert!(analytics.humidity.is_empty());
        assert_eq!(analytics.sunlight.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_merged_newest_first() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors(
                    "c1",
                    vec![
                        Sensor::new("s1", "Soil", "dev-1"),
                        Sensor::new("s2", "Temp", "dev-1"),
                    ],
                )
                .with_actions("s1", vec![log("a1", "s1", 1), log("a3", "s1", 3)])
                .with_actions("s2", vec![log("a2", "s2", 2)]),
        );
        let service = service(&mock);

        let events = service
            .crop_events(&CropId::from("c1"), 2)
            .await
            .expect("events");
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_partial_failure_keeps_other_sensors() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors(
                    "c1",
                    vec![
                        Sensor::new("s1", "Soil", "dev-1"),
                        Sensor::new("s2", "Temp", "dev-1"),
                    ],
                )
                .with_actions("s2", vec![log("a2", "s2", 2)])
                .with_keyed_failure(MockCall::ListActions, "s1"),
        );
        let service = service(&mock);

        let events = service
            .crop_events(&CropId::from("c1"), 5)
            .await
            .expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_fail_when_every_query_fails() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_sensors("c1", vec![Sensor::new("s1", "Soil", "dev-1")])
                .with_failure(MockCall::ListActions),
        );
        let service = service(&mock);

        assert!(service.crop_events(&CropId::from("c1"), 5).await.is_err());
        // A crop without sensors simply has no events
        let empty = service
            .crop_events(&CropId::from("c2"), 5)
            .await
            .expect("events");
        assert!(empty.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_comparison_from_crop_list() {
        let mock = Arc::new(
            MockFetcher::new()
                .with_crop(Crop::new("c1", "Corn", CropStatus::Growing))
                .with_crop(Crop::new("c2", "Wheat", CropStatus::Harvested)),
        );
        let service = service(&mock);

        let rows = service.crop_comparison().await.expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Wheat");
        let _ = service.crop_comparison().await.expect("rows");
        assert_eq!(mock.calls(MockCall::ListEntities), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_action_without_sensors() {
        let mock = Arc::new(MockFetcher::new().with_sensors("c1", Vec::new()));
        let service = service(&mock);

        let result = service.execute_action(&CropId::from("c1"), "irrigation_on").await;
        assert!(matches!(result, Err(Error::NoSensors { .. })));
        assert_eq!(mock.calls(MockCall::ExecuteAction), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_action_targets_first_sensor_device() {
        let mock = Arc::new(MockFetcher::new().with_sensors(
            "c1",
            vec![
                Sensor::new("s1", "Soil", "dev-7"),
                Sensor::new("s2", "Temp", "dev-8"),
            ],
        ));
        let service = service(&mock);

        let ack = service
            .execute_action(&CropId::from("c1"), "irrigation_on")
            .await
            .expect("ack");
        assert!(ack.ok);

        let executed = mock.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].device_id, "dev-7");
        assert_eq!(executed[0].action, "irrigation_on");
        assert_eq!(executed[0].context.sensor_id.as_deref(), Some("s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_cache_bounded() {
        let mut mock = MockFetcher::new();
        for i in 0..15 {
            mock = mock.with_sensors(&format!("c{i}"), Vec::new());
        }
        let mock = Arc::new(mock);
        let service = service(&mock);

        for i in 0..15 {
            let _ = service.crop_sensors(&CropId::from(format!("c{i}"))).await;
        }
        assert_eq!(service.cache_stats().sensors, 10);

        // c0 was evicted and is fetched again
        let _ = service.crop_sensors(&CropId::from("c0")).await;
        assert_eq!(mock.calls(MockCall::ListSensors), 16);
    }
}
