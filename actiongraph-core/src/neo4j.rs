//! Neo4j graph backend over the HTTP transaction endpoint.
//!
//! Layout:
//! - `(:Episode {uuid, name, content, source, entity_names, reference_time, created_at, embedding})`
//! - `(:Entity {name})`
//! - `(:Episode)-[:MENTIONS]->(:Entity)`, one edge per entity-name hint
//!
//! Search embeds the query and reads the `episode_embedding` vector index.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::backend::{Embedder, GraphBackend};
use crate::config::{ActionGraphConfig, GraphConfig};
use crate::episode::Episode;
use crate::error::BackendError;
use crate::ollama::OllamaEmbedder;

pub const VECTOR_INDEX: &str = "episode_embedding";

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT episode_uuid IF NOT EXISTS FOR (e:Episode) REQUIRE e.uuid IS UNIQUE",
    "CREATE CONSTRAINT entity_name IF NOT EXISTS FOR (n:Entity) REQUIRE n.name IS UNIQUE",
    "CREATE FULLTEXT INDEX episode_content IF NOT EXISTS FOR (e:Episode) ON EACH [e.name, e.content]",
];

const ADD_EPISODE: &str = r#"
CREATE (e:Episode {
    uuid: $uuid,
    name: $name,
    content: $content,
    source: $source,
    entity_names: $entity_names,
    reference_time: $reference_time,
    created_at: $created_at,
    embedding: $embedding
})
WITH e
UNWIND $entity_names AS entity_name
MERGE (n:Entity {name: entity_name})
MERGE (e)-[:MENTIONS]->(n)
"#;

const SEARCH_EPISODES: &str = r#"
CALL db.index.vector.queryNodes($index, $limit, $embedding) YIELD node, score
RETURN node.uuid AS uuid,
       node.name AS name,
       node.content AS content,
       node.source AS source,
       node.entity_names AS entity_names,
       node.reference_time AS reference_time,
       node.created_at AS created_at,
       score
ORDER BY score DESC
"#;

// ============================================================================
// Transaction API wire types (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct TxRequest {
    statements: Vec<Statement>,
}

#[derive(Debug, Serialize)]
struct Statement {
    statement: String,
    parameters: Value,
}

impl Statement {
    fn new(statement: impl Into<String>, parameters: Value) -> Self {
        Self {
            statement: statement.into(),
            parameters,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl StatementResult {
    /// Zip `columns` with each row into a JSON object.
    fn into_records(self) -> Vec<Value> {
        let columns = self.columns;
        self.data
            .into_iter()
            .map(|r| {
                let record: Map<String, Value> =
                    columns.iter().cloned().zip(r.row.into_iter()).collect();
                Value::Object(record)
            })
            .collect()
    }
}

// ============================================================================
// Neo4jGraph
// ============================================================================

pub struct Neo4jGraph {
    client: Client,
    endpoint: String,
    user: String,
    password: String,
    embedder: Arc<dyn Embedder>,
}

impl Neo4jGraph {
    pub fn new(
        config: &GraphConfig,
        embedder: Arc<dyn Embedder>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );

        Ok(Self {
            client,
            endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
            embedder,
        })
    }

    /// Neo4j graph with an Ollama embedder, both from application config.
    pub fn from_config(config: &ActionGraphConfig) -> Result<Self, BackendError> {
        let timeout = config.backend.timeout();
        let embedder = OllamaEmbedder::new(&config.model, timeout)?;
        Self::new(&config.graph, Arc::new(embedder), timeout)
    }

    async fn run(&self, statements: Vec<Statement>) -> Result<Vec<StatementResult>, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&TxRequest { statements })
            .send()
            .await
            .map_err(BackendError::transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Auth {
                service: "neo4j",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: TxResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) if status.is_success() => {
                return Err(BackendError::InvalidResponse(e.to_string()));
            }
            Err(_) => {
                return Err(BackendError::InvalidResponse(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body
                )));
            }
        };

        if let Some(err) = parsed.errors.into_iter().next() {
            tracing::error!(code = %err.code, message = %err.message, "Neo4j statement failed");
            return Err(BackendError::Query {
                code: err.code,
                message: err.message,
            });
        }

        if !status.is_success() {
            return Err(BackendError::InvalidResponse(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(parsed.results)
    }
}

#[async_trait]
impl GraphBackend for Neo4jGraph {
    async fn build_indices(&self) -> Result<(), BackendError> {
        let mut statements: Vec<Statement> = SCHEMA_STATEMENTS
            .iter()
            .map(|s| Statement::new(*s, json!({})))
            .collect();

        // Index options do not accept parameters.
        statements.push(Statement::new(
            format!(
                "CREATE VECTOR INDEX {} IF NOT EXISTS FOR (e:Episode) ON (e.embedding) \
                 OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: 'cosine'}}}}",
                VECTOR_INDEX,
                self.embedder.dimensions()
            ),
            json!({}),
        ));

        self.run(statements).await?;
        tracing::info!(endpoint = %self.endpoint, "Neo4j indices ready");
        Ok(())
    }

    async fn add_episode(&self, episode: &Episode) -> Result<(), BackendError> {
        let embedding = self.embedder.embed(&episode.content).await?;
        let uuid = Uuid::new_v4();

        let parameters = json!({
            "uuid": uuid.to_string(),
            "name": episode.name,
            "content": episode.content,
            "source": episode.source,
            "entity_names": episode.entity_names,
            "reference_time": episode
                .reference_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true)),
            "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "embedding": embedding,
        });

        self.run(vec![Statement::new(ADD_EPISODE, parameters)]).await?;
        tracing::debug!(%uuid, name = %episode.name, "Episode stored");
        Ok(())
    }

    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<Value>, BackendError> {
        let embedding = self.embedder.embed(query).await?;
        let parameters = json!({
            "index": VECTOR_INDEX,
            "limit": num_results,
            "embedding": embedding,
        });

        let results = self
            .run(vec![Statement::new(SEARCH_EPISODES, parameters)])
            .await?;

        Ok(results
            .into_iter()
            .next()
            .map(StatementResult::into_records)
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "neo4j"
    }
}
