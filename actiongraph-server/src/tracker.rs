//! Request handling: validate, format an episode, forward to the backend.
//!
//! Each operation makes at most one backend call, bounded by the configured
//! timeout. The HTTP layer only extracts and serialises around these.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actiongraph_core::models::{ActionResult, QueryRequest, Session, UIAction};
use actiongraph_core::{action_id, session_tag, with_timeout, BackendError, Episode, GraphBackend};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub const SERVICE_NAME: &str = "ui-ae-graphiti-tracker";

const SUCCESS: &str = "success";

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionTracked {
    pub status: String,
    pub action_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Acknowledged {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionEvent {
    pub status: String,
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResults {
    pub status: String,
    pub query: String,
    pub results: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Clone)]
pub struct Tracker {
    backend: Arc<dyn GraphBackend>,
    timeout: Duration,
}

impl Tracker {
    pub fn new(backend: Arc<dyn GraphBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        with_timeout(self.timeout, fut).await.map_err(ApiError::from)
    }

    pub async fn track_action(&self, action: UIAction) -> Result<ActionTracked, ApiError> {
        let episode = Episode::from_action(&action);
        self.call(self.backend.add_episode(&episode)).await?;

        let id = action_id(&action);
        tracing::info!(
            session_id = %action.session_id,
            action_type = %action.action_type,
            action_id = %id,
            "Action tracked"
        );

        Ok(ActionTracked {
            status: SUCCESS.to_string(),
            action_id: id,
            message: "Action tracked successfully".to_string(),
        })
    }

    pub async fn track_action_result(&self, result: ActionResult) -> Result<Acknowledged, ApiError> {
        let episode = Episode::from_result(&result);
        self.call(self.backend.add_episode(&episode)).await?;

        tracing::info!(action_id = %result.action_id, success = result.success, "Action result tracked");

        Ok(Acknowledged {
            status: SUCCESS.to_string(),
            message: "Action result tracked successfully".to_string(),
        })
    }

    pub async fn start_session(&self, session: Session) -> Result<SessionEvent, ApiError> {
        let episode = Episode::session_start(&session);
        self.call(self.backend.add_episode(&episode)).await?;

        tracing::info!(session_id = %session.session_id, "Session started");

        Ok(SessionEvent {
            status: SUCCESS.to_string(),
            session_id: session.session_id,
            message: "Session started successfully".to_string(),
        })
    }

    /// End time is taken from the server clock, never from the caller.
    pub async fn end_session(&self, session_id: String) -> Result<SessionEvent, ApiError> {
        let episode = Episode::session_end(&session_id, Utc::now());
        self.call(self.backend.add_episode(&episode)).await?;

        tracing::info!(session_id = %session_id, "Session ended");

        Ok(SessionEvent {
            status: SUCCESS.to_string(),
            session_id,
            message: "Session ended successfully".to_string(),
        })
    }

    pub async fn query_graph(&self, request: QueryRequest) -> Result<QueryResults, ApiError> {
        request.validate().map_err(ApiError::Validation)?;

        let mut results = self
            .call(self.backend.search(&request.query, request.limit))
            .await?;

        if let Some(session_id) = request.session_id.as_deref() {
            results = filter_by_session(results, session_id);
        }

        tracing::debug!(query = %request.query, count = results.len(), "Graph queried");

        Ok(QueryResults {
            status: SUCCESS.to_string(),
            count: results.len(),
            query: request.query,
            results,
        })
    }

    /// Liveness only; the backend is not consulted.
    pub fn health(&self) -> Health {
        Health {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Keep results with a string value containing `session_<id>`.
///
/// Substring match over string leaves, not structural: `session_s1` also
/// matches hits tagged `session_s10`.
pub fn filter_by_session(results: Vec<Value>, session_id: &str) -> Vec<Value> {
    let tag = session_tag(session_id);
    results
        .into_iter()
        .filter(|r| mentions(r, &tag))
        .collect()
}

fn mentions(value: &Value, tag: &str) -> bool {
    match value {
        Value::String(s) => s.contains(tag),
        Value::Array(items) => items.iter().any(|v| mentions(v, tag)),
        Value::Object(fields) => fields.values().any(|v| mentions(v, tag)),
        _ => false,
    }
}
