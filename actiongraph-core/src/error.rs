use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by a graph backend or the model service behind it.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Authentication rejected by {service} (HTTP {status})")]
    Auth { service: &'static str, status: u16 },

    #[error("Graph query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("Embedding request failed (HTTP {status}): {message}")]
    Embedding { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// Classify a transport error: refused connections and timeouts mean the
    /// service is unreachable, everything else stays an HTTP error.
    pub fn transport(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            BackendError::Unavailable(e.to_string())
        } else {
            BackendError::Http(e)
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable(_) | BackendError::Timeout(_))
    }
}
