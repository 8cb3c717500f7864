//! Scripted in-memory fetcher for tests
//!
//! Every call is counted, can be delayed with `tokio::time::sleep` (so paused
//! test clocks control it) and can be made to fail, either for all keys or for
//! a single crop/sensor id.

use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::action::{ActionAck, ActionFilter, ActionLog, ActionPage, ExecuteActionRequest};
use crate::domain::crop::{Crop, CropId};
use crate::domain::sensor::{Sensor, SensorReading};
use crate::error::FetchError;
use crate::services::fetcher::{FetchResult, Fetcher};

/// Fetcher operation, used to script and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    ListEntities,
    GetEntity,
    ListSensors,
    GetReadings,
    ExecuteAction,
    ListActions,
}

#[derive(Default)]
pub struct MockFetcher {
    crops: Vec<Crop>,
    sensors: AHashMap<String, Vec<Sensor>>,
    readings: AHashMap<String, Vec<SensorReading>>,
    actions: AHashMap<String, Vec<ActionLog>>,
    delays: AHashMap<(MockCall, Option<String>), Duration>,
    failures: AHashSet<(MockCall, Option<String>)>,
    calls: Mutex<AHashMap<MockCall, usize>>,
    keyed_calls: Mutex<Vec<(MockCall, String)>>,
    executed: Mutex<Vec<ExecuteActionRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.crops.push(crop);
        self
    }

    pub fn with_sensors(mut self, crop_id: &str, sensors: Vec<Sensor>) -> Self {
        self.sensors.insert(crop_id.to_string(), sensors);
        self
    }

    pub fn with_readings(mut self, sensor_id: &str, readings: Vec<SensorReading>) -> Self {
        self.readings.insert(sensor_id.to_string(), readings);
        self
    }

    pub fn with_actions(mut self, sensor_id: &str, actions: Vec<ActionLog>) -> Self {
        self.actions.insert(sensor_id.to_string(), actions);
        self
    }

    pub fn with_delay(mut self, call: MockCall, delay: Duration) -> Self {
        self.delays.insert((call, None), delay);
        self
    }

    /// Delay only calls whose crop or sensor id is `key`
    pub fn with_keyed_delay(mut self, call: MockCall, key: &str, delay: Duration) -> Self {
        self.delays.insert((call, Some(key.to_string())), delay);
        self
    }

    pub fn with_failure(mut self, call: MockCall) -> Self {
        self.failures.insert((call, None));
        self
    }

    /// Fail only calls whose crop or sensor id is `key`
    pub fn with_keyed_failure(mut self, call: MockCall, key: &str) -> Self {
        self.failures.insert((call, Some(key.to_string())));
        self
    }

    /// Number of calls made to `call`
    pub fn calls(&self, call: MockCall) -> usize {
        self.calls.lock().get(&call).copied().unwrap_or(0)
    }

    /// Keys passed to `call`, in call order
    pub fn keys(&self, call: MockCall) -> Vec<String> {
        self.keyed_calls
            .lock()
            .iter()
            .filter(|(c, _)| *c == call)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Action requests received so far
    pub fn executed(&self) -> Vec<ExecuteActionRequest> {
        self.executed.lock().clone()
    }

    async fn enter(&self, call: MockCall, key: Option<&str>) -> FetchResult<()> {
        *self.calls.lock().entry(call).or_default() += 1;
        if let Some(key) = key {
            self.keyed_calls.lock().push((call, key.to_string()));
        }

        let keyed = (call, key.map(str::to_string));
        let delay = self
            .delays
            .get(&keyed)
            .or_else(|| self.delays.get(&(call, None)))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failures.contains(&keyed) || self.failures.contains(&(call, None)) {
            return Err(FetchError::transient(format!("scripted {call:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn list_entities(&self) -> FetchResult<Vec<Crop>> {
        self.enter(MockCall::ListEntities, None).await?;
        Ok(self.crops.clone())
    }

    async fn get_entity(&self, crop_id: &CropId) -> FetchResult<Crop> {
        self.enter(MockCall::GetEntity, Some(crop_id.as_str())).await?;
        self.crops
            .iter()
            .find(|c| &c.crop_id == crop_id)
            .cloned()
            .ok_or_else(|| FetchError::transient(format!("crop {crop_id} not found")))
    }

    async fn list_sensors_for_entity(
        &self,
        crop_id: &CropId,
        _include_readings: bool,
    ) -> FetchResult<Vec<Sensor>> {
        self.enter(MockCall::ListSensors, Some(crop_id.as_str())).await?;
        Ok(self.sensors.get(crop_id.as_str()).cloned().unwrap_or_default())
    }

    async fn get_readings(
        &self,
        sensor_id: &str,
        limit: usize,
        offset: usize,
    ) -> FetchResult<Vec<SensorReading>> {
        self.enter(MockCall::GetReadings, Some(sensor_id)).await?;
        Ok(self
            .readings
            .get(sensor_id)
            .map(|r| r.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn execute_action(&self, request: &ExecuteActionRequest) -> FetchResult<ActionAck> {
        self.enter(MockCall::ExecuteAction, Some(&request.device_id)).await?;
        self.executed.lock().push(request.clone());
        Ok(ActionAck { ok: true })
    }

    async fn list_actions(&self, filter: &ActionFilter) -> FetchResult<ActionPage> {
        let sensor_id = filter.sensor_id.clone().unwrap_or_default();
        self.enter(MockCall::ListActions, Some(&sensor_id)).await?;
        let items: Vec<ActionLog> = self
            .actions
            .get(&sensor_id)
            .map(|a| {
                a.iter()
                    .take(filter.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(ActionPage {
            total: items.len() as u64,
            items,
        })
    }
}
