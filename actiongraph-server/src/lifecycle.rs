//! Owns the single backend instance for the life of the process.
//!
//! `start` readies the backend (indices must exist before traffic is served),
//! `shutdown` consumes the lifecycle and releases it.

use std::sync::Arc;
use std::time::Duration;

use actiongraph_core::{with_timeout, ActionGraphConfig, BackendError, GraphBackend, Neo4jGraph};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::tracker::Tracker;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

pub struct Lifecycle {
    backend: Arc<dyn GraphBackend>,
    timeout: Duration,
}

impl Lifecycle {
    /// Build indices, retrying transient failures up to
    /// `backend.init_retries` times. Any other failure is returned at once.
    pub async fn start(
        config: &ActionGraphConfig,
        backend: Arc<dyn GraphBackend>,
    ) -> Result<Self, BackendError> {
        let timeout = config.backend.timeout();

        tracing::info!(
            backend = backend.name(),
            graph_uri = %config.graph.uri,
            model_endpoint = %config.model.base_url,
            llm_model = %config.model.llm_model,
            embedding_model = %config.model.embedding_model,
            "Initializing graph backend"
        );

        let retry_strategy = startup_backoff(config.backend.init_retry_delay_ms)
            .map(jitter)
            .take(config.backend.init_retries as usize);

        let result = RetryIf::start(
            retry_strategy,
            || {
                let backend = backend.clone();
                async move { with_timeout(timeout, backend.build_indices()).await }
            },
            |e: &BackendError| {
                let transient = e.is_unavailable();
                if transient {
                    tracing::warn!(error = %e, "Graph backend not ready, retrying");
                }
                transient
            },
        )
        .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to initialize graph backend");
            return Err(e);
        }

        tracing::info!(backend = backend.name(), "Graph backend initialized");
        Ok(Self { backend, timeout })
    }

    /// `start` with the Neo4j backend described by `config`.
    pub async fn start_neo4j(config: &ActionGraphConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn GraphBackend> = Arc::new(Neo4jGraph::from_config(config)?);
        Self::start(config, backend).await
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::new(self.backend.clone(), self.timeout)
    }

    /// Close the backend once. Failures are logged, not retried.
    pub async fn shutdown(self) {
        match with_timeout(self.timeout, self.backend.close()).await {
            Ok(()) => tracing::info!(backend = self.backend.name(), "Graph backend closed"),
            Err(e) => tracing::warn!(error = %e, "Graph backend close failed"),
        }
    }
}

/// Delays that start at `initial_ms` and double, capped at 10s.
fn startup_backoff(initial_ms: u64) -> ExponentialBackoff {
    // tokio-retry raises the base to the attempt number, then multiplies.
    ExponentialBackoff::from_millis(2)
        .factor((initial_ms / 2).max(1))
        .max_delay(MAX_RETRY_DELAY)
}
