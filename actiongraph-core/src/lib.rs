pub mod backend;
pub mod config;
pub mod episode;
pub mod error;
pub mod models;
pub mod neo4j;
pub mod ollama;

pub use backend::{with_timeout, Embedder, GraphBackend};
pub use config::ActionGraphConfig;
pub use episode::{action_id, session_tag, Episode, EPISODE_SOURCE};
pub use error::{ActionGraphError, BackendError};
pub use neo4j::Neo4jGraph;
pub use ollama::OllamaEmbedder;
