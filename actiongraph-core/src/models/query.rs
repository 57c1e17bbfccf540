use serde::{Deserialize, Serialize};

pub const MIN_QUERY_LIMIT: u32 = 1;
pub const MAX_QUERY_LIMIT: u32 = 100;
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

fn default_limit() -> u32 {
    DEFAULT_QUERY_LIMIT
}

/// Natural-language query over the graph, optionally scoped to one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl QueryRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_QUERY_LIMIT..=MAX_QUERY_LIMIT).contains(&self.limit) {
            return Err(format!(
                "limit must be between {} and {}, got {}",
                MIN_QUERY_LIMIT, MAX_QUERY_LIMIT, self.limit
            ));
        }
        Ok(())
    }
}
