use config::{Config, ConfigBuilder, ConfigError, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ActionGraphConfig {
    pub service: ServiceConfig,
    pub graph: GraphConfig,
    pub model: ModelConfig,
    pub backend: BackendConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

/// Neo4j connection, reached through its HTTP transaction endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Ollama endpoint and the models served from it.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub llm_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub timeout_seconds: u64,
    pub init_retries: u32,
    pub init_retry_delay_ms: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Built-in defaults, applied before the optional TOML file.
const DEFAULTS: &[(&str, &str)] = &[
    ("service.log_level", "info"),
    ("graph.uri", "http://localhost:7474"),
    ("graph.user", "neo4j"),
    ("graph.password", "password"),
    ("graph.database", "neo4j"),
    ("model.base_url", "http://localhost:11434"),
    ("model.llm_model", "gemma3n:e2b"),
    ("model.embedding_model", "nomic-embed-text"),
    ("model.embedding_dimensions", "768"),
    ("backend.timeout_seconds", "30"),
    ("backend.init_retries", "3"),
    ("backend.init_retry_delay_ms", "500"),
    ("http.host", "0.0.0.0"),
    ("http.port", "8100"),
];

/// Environment variable → config key. Environment wins over the file.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LOG_LEVEL", "service.log_level"),
    ("NEO4J_URI", "graph.uri"),
    ("NEO4J_USER", "graph.user"),
    ("NEO4J_PASSWORD", "graph.password"),
    ("NEO4J_DATABASE", "graph.database"),
    ("OLLAMA_BASE_URL", "model.base_url"),
    ("OLLAMA_LLM_MODEL", "model.llm_model"),
    ("OLLAMA_EMBEDDING_MODEL", "model.embedding_model"),
    ("OLLAMA_EMBEDDING_DIMENSIONS", "model.embedding_dimensions"),
    ("BACKEND_TIMEOUT_SECONDS", "backend.timeout_seconds"),
    ("BACKEND_INIT_RETRIES", "backend.init_retries"),
    ("BACKEND_INIT_RETRY_DELAY_MS", "backend.init_retry_delay_ms"),
    ("GRAPHITI_SERVICE_HOST", "http.host"),
    ("GRAPHITI_SERVICE_PORT", "http.port"),
];

impl ActionGraphConfig {
    /// Load defaults, then `path` if it exists, then the process environment.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with(Some(path), |key| std::env::var(key).ok())
    }

    /// Layered load with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = defaults()?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, env(*var))?;
        }

        builder.build()?.try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = Config::builder();
    for (key, value) in DEFAULTS {
        builder = builder.set_default(*key, *value)?;
    }
    Ok(builder)
}
