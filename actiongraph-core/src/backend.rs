//! Backend seams: the knowledge-graph store and the embedder it relies on.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::episode::Episode;
use crate::error::BackendError;

/// Knowledge-graph store. One instance is shared by every request handler.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Create indices and constraints. Must be safe to call repeatedly.
    async fn build_indices(&self) -> Result<(), BackendError>;

    /// Persist one episode together with its entity-name hints.
    async fn add_episode(&self, episode: &Episode) -> Result<(), BackendError>;

    /// Natural-language search, at most `num_results` hits.
    async fn search(
        &self,
        query: &str,
        num_results: u32,
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    /// Release held resources. Called once at shutdown.
    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Bound a backend call by `limit`, turning an elapsed deadline into
/// `BackendError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}
