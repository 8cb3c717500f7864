//! HTTP Fetcher
//!
//! [`Fetcher`] over the farm backend's REST API.
//!
//! | operation                 | request                                          |
//! |---------------------------|--------------------------------------------------|
//! | `list_entities`           | `GET /crops`                                     |
//! | `get_entity`              | `GET /crops/{id}`                                |
//! | `list_sensors_for_entity` | `GET /crops/{id}/sensors?includeReadings=`       |
//! | `get_readings`            | `GET /sensor-readings/by-sensor/{id}?limit=&offset=` |
//! | `execute_action`          | `POST /actions/execute`                          |
//! | `list_actions`            | `GET /actions?limit=&offset=&device_id=&sensor_id=` |

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::action::{ActionAck, ActionFilter, ActionPage, ExecuteActionRequest};
use crate::domain::config::ApiConfig;
use crate::domain::crop::{Crop, CropId};
use crate::domain::sensor::{Sensor, SensorReading};
use crate::error::{FetchError, Result};
use crate::services::fetcher::{FetchResult, Fetcher};

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_error(&self, path: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::timeout(path, self.timeout)
        } else {
            FetchError::transient(err)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FetchResult<T> {
        debug!(path = %path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(path, e))?;
        response.json::<T>().await.map_err(|e| self.map_error(path, e))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> FetchResult<T> {
        debug!(path = %path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(path, e))?;
        response.json::<T>().await.map_err(|e| self.map_error(path, e))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn list_entities(&self) -> FetchResult<Vec<Crop>> {
        self.get_json("/crops", &[]).await
    }

    async fn get_entity(&self, crop_id: &CropId) -> FetchResult<Crop> {
        self.get_json(&format!("/crops/{crop_id}"), &[]).await
    }

    async fn list_sensors_for_entity(
        &self,
        crop_id: &CropId,
        include_readings: bool,
    ) -> FetchResult<Vec<Sensor>> {
        self.get_json(
            &format!("/crops/{crop_id}/sensors"),
            &[("includeReadings", include_readings.to_string())],
        )
        .await
    }

    async fn get_readings(
        &self,
        sensor_id: &str,
        limit: usize,
        offset: usize,
    ) -> FetchResult<Vec<SensorReading>> {
        self.get_json(
            &format!("/sensor-readings/by-sensor/{sensor_id}"),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn execute_action(&self, request: &ExecuteActionRequest) -> FetchResult<ActionAck> {
        self.post_json("/actions/execute", request).await
    }

    async fn list_actions(&self, filter: &ActionFilter) -> FetchResult<ActionPage> {
        self.get_json("/actions", &filter.query_pairs()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let config = ApiConfig {
            base_url: "http://farm.local/api/v1/".to_string(),
            request_timeout_ms: 1000,
        };
        let fetcher = HttpFetcher::new(&config).expect("client");
        assert_eq!(fetcher.base_url(), "http://farm.local/api/v1");
        assert_eq!(
            fetcher.url("/crops/c1/sensors"),
            "http://farm.local/api/v1/crops/c1/sensors"
        );
    }
}
