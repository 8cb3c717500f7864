//! Fetcher - Backend Data Access Abstraction
//!
//! Everything the dashboard needs from the backend goes through [`Fetcher`].
//! The production implementation is [`super::http::HttpFetcher`]; tests script
//! a mock with delays and failures.
//!
//! Fetcher failures are [`FetchError`]s so they can be stored inside shared
//! results and handed to every waiter unchanged.

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};

use crate::domain::action::{ActionAck, ActionFilter, ActionPage, ExecuteActionRequest};
use crate::domain::crop::{Crop, CropId};
use crate::domain::sensor::{Sensor, SensorReading};
use crate::error::FetchError;

/// Result of a single fetcher call
pub type FetchResult<T> = Result<T, FetchError>;

/// A result any number of callers can await; all observe the same value
pub type SharedResult<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// Remote data source for crops, sensors, readings and actions
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// All crops visible to the user
    async fn list_entities(&self) -> FetchResult<Vec<Crop>>;

    /// A single crop
    async fn get_entity(&self, crop_id: &CropId) -> FetchResult<Crop>;

    /// Sensors attached to a crop, optionally with their latest readings embedded
    async fn list_sensors_for_entity(
        &self,
        crop_id: &CropId,
        include_readings: bool,
    ) -> FetchResult<Vec<Sensor>>;

    /// Most recent readings of a sensor
    async fn get_readings(
        &self,
        sensor_id: &str,
        limit: usize,
        offset: usize,
    ) -> FetchResult<Vec<SensorReading>>;

    /// Ask the backend to execute a device action
    async fn execute_action(&self, request: &ExecuteActionRequest) -> FetchResult<ActionAck>;

    /// Query the action log
    async fn list_actions(&self, filter: &ActionFilter) -> FetchResult<ActionPage>;
}
