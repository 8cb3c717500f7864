//! Action - Device Action Requests and Action Log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority class of a manually executed action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Critical,
    Important,
    #[default]
    Normal,
}

/// Sensor context attached to an action request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
}

/// An action execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionRequest {
    /// Target device
    pub device_id: String,
    /// Action name, e.g. "irrigation_on"
    pub action: String,
    /// Client-generated ID for tracking
    pub action_id: String,
    pub action_type: ActionType,
    pub context: ActionContext,
}

impl ExecuteActionRequest {
    /// Create a normal-priority request with a fresh action ID
    pub fn new(device_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            action: action.into(),
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: ActionType::Normal,
            context: ActionContext::default(),
        }
    }

    /// Attach sensor context
    pub fn with_context(mut self, context: ActionContext) -> Self {
        self.context = context;
        self
    }
}

/// Backend acknowledgement of an action request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    pub ok: bool,
}

/// Who triggered a logged action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Auto,
    Manual,
}

/// Delivery status of a logged action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Queued,
    Sent,
    Ack,
    Error,
    Timeout,
    Failed,
    #[serde(other)]
    Unknown,
}

/// An entry of the backend action log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub trigger_source: TriggerSource,
    pub device_id: String,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub violation_type: Option<String>,
    pub action_uri: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One page of the action log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPage {
    pub items: Vec<ActionLog>,
    pub total: u64,
}

/// Query filter for the action log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    pub sensor_id: Option<String>,
    pub device_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ActionFilter {
    /// Filter by sensor with a result limit
    pub fn for_sensor(sensor_id: impl Into<String>, limit: usize) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Query-string pairs for the non-empty fields
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(device_id) = self.device_id.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("device_id", device_id.clone()));
        }
        if let Some(sensor_id) = self.sensor_id.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("sensor_id", sensor_id.clone()));
        }
        pairs
    }
}
