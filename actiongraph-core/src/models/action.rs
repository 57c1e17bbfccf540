use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp;

/// A UI action performed by the agent (click, type, scroll, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIAction {
    pub action_type: String,
    #[serde(default)]
    pub action_inputs: Map<String, Value>,
    #[serde(default)]
    pub target_element: Option<Map<String, Value>>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default)]
    pub user_intent: Option<String>,
}

impl UIAction {
    /// The target element's `name`, when present and a string.
    pub fn target_name(&self) -> Option<&str> {
        self.target_element
            .as_ref()
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
    }
}

/// Outcome of executing a previously tracked action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub screenshot_before: Option<String>,
    #[serde(default)]
    pub screenshot_after: Option<String>,
    pub execution_time_ms: f64,
}
