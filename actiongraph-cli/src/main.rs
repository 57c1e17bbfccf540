//! actiongraph-cli: command-line client for the actiongraph tracking service
//!
//! # Subcommands
//! - `health`                                   liveness of the service
//! - `track --type <t> --session <id> [...]`    record a UI action
//! - `result --action-id <id> [--failed] [...]` record an action outcome
//! - `session-start --session <id> [...]`       open a session
//! - `session-end --session <id>`               close a session
//! - `query <text> [-n <limit>] [--session]`    search the graph

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8100";
const DEFAULT_LIMIT: u32 = 10;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "actiongraph-cli",
    version,
    about = "Track UI actions and query the actiongraph knowledge graph"
)]
struct Cli {
    /// actiongraph HTTP server URL (overrides ACTIONGRAPH_URL env var)
    #[arg(long, env = "ACTIONGRAPH_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the service is up
    Health,

    /// Record a UI action
    Track {
        /// Action type (click, type, scroll, ...)
        #[arg(long = "type")]
        action_type: String,

        /// Session identifier
        #[arg(long)]
        session: String,

        /// Action parameters as a JSON object
        #[arg(long)]
        inputs: Option<String>,

        /// Target element as a JSON object
        #[arg(long)]
        target: Option<String>,

        /// The user's original intent
        #[arg(long)]
        intent: Option<String>,
    },

    /// Record the outcome of a tracked action
    Result {
        #[arg(long)]
        action_id: String,

        /// Mark the action as failed
        #[arg(long)]
        failed: bool,

        #[arg(long)]
        error: Option<String>,

        /// Execution time in milliseconds
        #[arg(long, default_value_t = 0.0)]
        time_ms: f64,
    },

    /// Start a tracking session
    SessionStart {
        #[arg(long)]
        session: String,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        goal: Option<String>,
    },

    /// End a tracking session
    SessionEnd {
        #[arg(long)]
        session: String,
    },

    /// Query the knowledge graph
    Query {
        /// Natural-language query
        query: String,

        /// Maximum number of results (1-100)
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Only keep results mentioning this session
        #[arg(long)]
        session: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<Value>,
    pub count: usize,
}

/// One-line summary of a search hit: name, then the first content line.
pub fn summarize_hit(hit: &Value) -> String {
    let name = hit["name"].as_str().unwrap_or("(unnamed)");
    let first_line: String = hit["content"]
        .as_str()
        .and_then(|c| c.lines().find(|l| !l.trim().is_empty()))
        .unwrap_or("")
        .trim()
        .chars()
        .take(80)
        .collect();
    match hit["score"].as_f64() {
        Some(score) => format!("[{:.3}] {} | {}", score, name, first_line),
        None => format!("{} | {}", name, first_line),
    }
}

/// Parse an optional JSON-object argument.
pub fn parse_object(flag: &str, raw: Option<&str>) -> anyhow::Result<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let value: Value = serde_json::from_str(s)
                .map_err(|e| anyhow::anyhow!("--{} is not valid JSON: {}", flag, e))?;
            if !value.is_object() {
                anyhow::bail!("--{} must be a JSON object", flag);
            }
            Ok(Some(value))
        }
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Send a request, exit(1) on connection failure or a non-2xx status.
fn send(request: reqwest::blocking::RequestBuilder, url: &str) -> Value {
    let resp = match request.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("actiongraph-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("actiongraph-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    match resp.json() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("actiongraph-cli: failed to parse response: {}", e);
            std::process::exit(1);
        }
    }
}

fn post_json(server: &str, endpoint: &str, body: &Value) -> anyhow::Result<Value> {
    let url = format!("{}{}", server, endpoint);
    let request = client()?.post(&url).json(body);
    Ok(send(request, &url))
}

fn do_health(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let healthy = client()?
        .get(&url)
        .send()
        .ok()
        .filter(|r| r.status().is_success())
        .and_then(|r| r.json::<Value>().ok())
        .map(|v| v["status"] == "healthy")
        .unwrap_or(false);

    if healthy {
        println!("✅ actiongraph is healthy at {}", server);
        Ok(())
    } else {
        println!("❌ actiongraph is not reachable or unhealthy at {}", server);
        std::process::exit(1);
    }
}

fn do_query(
    server: &str,
    query: &str,
    limit: u32,
    session: Option<&str>,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut body = json!({ "query": query, "limit": limit });
    if let Some(s) = session {
        body["session_id"] = json!(s);
    }

    let raw = post_json(server, "/query", &body)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let parsed: QueryResponse = serde_json::from_value(raw)?;
    println!("{} result(s) for \"{}\"", parsed.count, parsed.query);
    for hit in &parsed.results {
        println!("  {}", summarize_hit(hit));
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Health => do_health(&server),

        Commands::Track {
            action_type,
            session,
            inputs,
            target,
            intent,
        } => {
            let mut body = json!({
                "action_type": action_type,
                "session_id": session,
                "action_inputs": parse_object("inputs", inputs.as_deref())?.unwrap_or_else(|| json!({})),
            });
            if let Some(t) = parse_object("target", target.as_deref())? {
                body["target_element"] = t;
            }
            if let Some(i) = intent {
                body["user_intent"] = json!(i);
            }
            let resp = post_json(&server, "/actions/track", &body)?;
            println!("{}", resp["action_id"].as_str().unwrap_or_default());
            Ok(())
        }

        Commands::Result {
            action_id,
            failed,
            error,
            time_ms,
        } => {
            let body = json!({
                "action_id": action_id,
                "success": !failed,
                "error_message": error,
                "execution_time_ms": time_ms,
            });
            let resp = post_json(&server, "/actions/result", &body)?;
            println!("{}", resp["message"].as_str().unwrap_or_default());
            Ok(())
        }

        Commands::SessionStart { session, user, goal } => {
            let body = json!({
                "session_id": session,
                "user_id": user,
                "goal": goal,
            });
            let resp = post_json(&server, "/sessions/start", &body)?;
            println!("{}", resp["session_id"].as_str().unwrap_or_default());
            Ok(())
        }

        Commands::SessionEnd { session } => {
            let url = format!("{}/sessions/end", server);
            let request = client()?.post(&url).query(&[("session_id", session.as_str())]);
            let resp = send(request, &url);
            println!("{}", resp["message"].as_str().unwrap_or_default());
            Ok(())
        }

        Commands::Query {
            query,
            limit,
            session,
            json,
        } => do_query(&server, &query, limit, session.as_deref(), json),
    }
}
