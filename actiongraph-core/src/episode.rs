//! Episode formatting.
//!
//! Each tracked event becomes one free-text episode plus an ordered list of
//! entity-name hints. The backend decides what to do with both; this module
//! only interpolates fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::timestamp::unix_seconds;
use crate::models::{ActionResult, Session, UIAction};

/// Source label attached to every episode this service writes.
pub const EPISODE_SOURCE: &str = "ui-ae-desktop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub content: String,
    pub entity_names: Vec<String>,
    pub source: String,
    pub reference_time: Option<DateTime<Utc>>,
}

/// Label used to tie entities and episodes to one session.
pub fn session_tag(session_id: &str) -> String {
    format!("session_{}", session_id)
}

/// Identifier returned to the caller for a tracked action.
pub fn action_id(action: &UIAction) -> String {
    format!("{}_{}", action.session_id, unix_seconds(&action.timestamp))
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn render_map(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}

impl Episode {
    fn new(name: String, content: String, entity_names: Vec<String>) -> Self {
        Self {
            name,
            content,
            entity_names,
            source: EPISODE_SOURCE.to_string(),
            reference_time: None,
        }
    }

    fn at(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn from_action(action: &UIAction) -> Self {
        let target = action
            .target_element
            .as_ref()
            .map(render_map)
            .unwrap_or_else(|| "None".to_string());

        let content = [
            format!("Action: {}", action.action_type),
            format!("Inputs: {}", render_map(&action.action_inputs)),
            format!("Target: {}", target),
            format!(
                "User Intent: {}",
                action.user_intent.as_deref().unwrap_or("Not specified")
            ),
            format!("Session: {}", action.session_id),
            format!("Time: {}", iso(&action.timestamp)),
        ]
        .join("\n");

        let mut entity_names = vec![action.action_type.clone(), session_tag(&action.session_id)];
        if let Some(name) = action.target_name() {
            entity_names.push(name.to_string());
        }

        Episode::new(
            format!("{}_{}", action.action_type, unix_seconds(&action.timestamp)),
            content,
            entity_names,
        )
        .at(action.timestamp)
    }

    pub fn from_result(result: &ActionResult) -> Self {
        let content = [
            format!("Action Result: {}", result.action_id),
            format!("Success: {}", result.success),
            format!("Error: {}", result.error_message.as_deref().unwrap_or("None")),
            format!("Execution Time: {}ms", result.execution_time_ms),
        ]
        .join("\n");

        let mut entity_names = vec![
            format!("action_{}", result.action_id),
            "action_result".to_string(),
        ];
        if !result.success {
            entity_names.push("error".to_string());
        }

        Episode::new(format!("result_{}", result.action_id), content, entity_names)
    }

    pub fn session_start(session: &Session) -> Self {
        let content = [
            format!("New Session Started: {}", session.session_id),
            format!("User: {}", session.user_id.as_deref().unwrap_or("Anonymous")),
            format!("Goal: {}", session.goal.as_deref().unwrap_or("Not specified")),
            format!("Start Time: {}", iso(&session.start_time)),
        ]
        .join("\n");

        Episode::new(
            format!("session_start_{}", session.session_id),
            content,
            vec![session_tag(&session.session_id), "session_start".to_string()],
        )
        .at(session.start_time)
    }

    pub fn session_end(session_id: &str, end_time: DateTime<Utc>) -> Self {
        let content = [
            format!("Session Ended: {}", session_id),
            format!("End Time: {}", iso(&end_time)),
        ]
        .join("\n");

        Episode::new(
            format!("session_end_{}", session_id),
            content,
            vec![session_tag(session_id), "session_end".to_string()],
        )
        .at(end_time)
    }
}
