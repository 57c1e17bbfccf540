//! HTTP integration tests for the actiongraph REST API
//!
//! Handlers are dispatched through the real router with `oneshot`; the graph
//! backend is an in-memory double so no Neo4j or Ollama is needed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actiongraph_core::{BackendError, Episode, GraphBackend};
use actiongraph_server::http::{build_router, HttpState};
use actiongraph_server::Tracker;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct MemoryBackend {
    episodes: Mutex<Vec<Episode>>,
    search_calls: Mutex<u32>,
    search_error: Option<String>,
    panic_on_search: bool,
    stall_search: bool,
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn build_indices(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn add_episode(&self, episode: &Episode) -> Result<(), BackendError> {
        self.episodes.lock().unwrap().push(episode.clone());
        Ok(())
    }

    async fn search(&self, _query: &str, num_results: u32) -> Result<Vec<Value>, BackendError> {
        if self.panic_on_search {
            panic!("search index corrupted");
        }
        if self.stall_search {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        *self.search_calls.lock().unwrap() += 1;
        if let Some(message) = &self.search_error {
            return Err(BackendError::Query {
                code: "Neo.DatabaseError.General.UnknownError".to_string(),
                message: message.clone(),
            });
        }
        let episodes = self.episodes.lock().unwrap();
        Ok(episodes
            .iter()
            .take(num_results as usize)
            .map(|e| serde_json::to_value(e).unwrap())
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn app(backend: Arc<MemoryBackend>) -> Router {
    app_with_timeout(backend, Duration::from_secs(5))
}

fn app_with_timeout(backend: Arc<MemoryBackend>, timeout: Duration) -> Router {
    let tracker = Tracker::new(backend, timeout);
    build_router(Arc::new(HttpState { tracker }))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ===========================================================================
// TEST 1: POST /actions/track: minimal click is accepted
// ===========================================================================
#[tokio::test]
async fn test_track_click_returns_session_prefixed_id() {
    let backend = Arc::new(MemoryBackend::default());
    let (status, body) = send(
        app(backend.clone()),
        "POST",
        "/actions/track",
        Some(json!({"action_type": "click", "session_id": "s1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Action tracked successfully");
    assert!(body["action_id"].as_str().unwrap().starts_with("s1_"));

    let episodes = backend.episodes.lock().unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].entity_names[..2], ["click", "session_s1"]);
}

// ===========================================================================
// TEST 2: POST /actions/track: missing session_id is rejected by the extractor
// ===========================================================================
#[tokio::test]
async fn test_track_missing_session_is_client_error() {
    let backend = Arc::new(MemoryBackend::default());
    let (status, _) = send(
        app(backend.clone()),
        "POST",
        "/actions/track",
        Some(json!({"action_type": "click"})),
    )
    .await;

    assert!(status.is_client_error(), "got {}", status);
    assert!(backend.episodes.lock().unwrap().is_empty());
}

// ===========================================================================
// TEST 3: POST /actions/result: failed result adds the error hint
// ===========================================================================
#[tokio::test]
async fn test_track_failed_result() {
    let backend = Arc::new(MemoryBackend::default());
    let (status, body) = send(
        app(backend.clone()),
        "POST",
        "/actions/result",
        Some(json!({
            "action_id": "s1_1718000000.5",
            "success": false,
            "error_message": "element not found",
            "execution_time_ms": 812.0
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Action result tracked successfully");
    assert!(body.get("action_id").is_none());

    let episodes = backend.episodes.lock().unwrap();
    assert_eq!(
        episodes[0].entity_names,
        vec!["action_s1_1718000000.5", "action_result", "error"]
    );
}

// ===========================================================================
// TEST 4: session start then end via query parameter
// ===========================================================================
#[tokio::test]
async fn test_session_start_and_end() {
    let backend = Arc::new(MemoryBackend::default());

    let (status, body) = send(
        app(backend.clone()),
        "POST",
        "/sessions/start",
        Some(json!({
            "session_id": "abc",
            "goal": "fill the form",
            "start_time": "2025-06-10T06:13:20"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "abc");
    assert_eq!(body["message"], "Session started successfully");

    let before_end = chrono::Utc::now();
    let (status, body) = send(app(backend.clone()), "POST", "/sessions/end?session_id=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "abc");
    assert_eq!(body["message"], "Session ended successfully");

    let episodes = backend.episodes.lock().unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].entity_names, vec!["session_abc", "session_start"]);
    assert_eq!(episodes[1].entity_names, vec!["session_abc", "session_end"]);
    assert!(episodes[1].reference_time.unwrap() >= before_end);
}

// ===========================================================================
// TEST 5: POST /sessions/end without session_id is a client error
// ===========================================================================
#[tokio::test]
async fn test_end_session_requires_session_id() {
    let backend = Arc::new(MemoryBackend::default());
    let (status, _) = send(app(backend.clone()), "POST", "/sessions/end", None).await;
    assert!(status.is_client_error(), "got {}", status);
    assert!(backend.episodes.lock().unwrap().is_empty());
}

// ===========================================================================
// TEST 6: POST /query: limit above 100 is rejected before any search
// ===========================================================================
#[tokio::test]
async fn test_query_limit_exceeds_max() {
    let backend = Arc::new(MemoryBackend::default());
    let (status, body) = send(
        app(backend.clone()),
        "POST",
        "/query",
        Some(json!({"query": "clicks", "limit": 200})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
    assert_eq!(*backend.search_calls.lock().unwrap(), 0);
}

// ===========================================================================
// TEST 7: POST /query: session filter returns a subset
// ===========================================================================
#[tokio::test]
async fn test_query_filters_by_session() {
    let backend = Arc::new(MemoryBackend::default());
    for (kind, session) in [("click", "s1"), ("type", "s2"), ("scroll", "s1")] {
        let (status, _) = send(
            app(backend.clone()),
            "POST",
            "/actions/track",
            Some(json!({"action_type": kind, "session_id": session})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, all) = send(app(backend.clone()), "POST", "/query", Some(json!({"query": "actions"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["count"], 3);
    assert_eq!(all["query"], "actions");

    let (status, scoped) = send(
        app(backend.clone()),
        "POST",
        "/query",
        Some(json!({"query": "actions", "session_id": "s1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scoped["count"], 2);
    let all_results = all["results"].as_array().unwrap();
    for hit in scoped["results"].as_array().unwrap() {
        assert!(all_results.contains(hit));
    }
}

// ===========================================================================
// TEST 8: POST /query: backend search error surfaces as 500 with message
// ===========================================================================
#[tokio::test]
async fn test_query_backend_error_is_500() {
    let backend = Arc::new(MemoryBackend {
        search_error: Some("vector index offline".to_string()),
        ..Default::default()
    });
    let (status, body) = send(app(backend), "POST", "/query", Some(json!({"query": "clicks"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("vector index offline"));
}

// ===========================================================================
// TEST 9: GET /health: 200 even when the backend is failing
// ===========================================================================
#[tokio::test]
async fn test_health_ignores_backend_state() {
    let backend = Arc::new(MemoryBackend {
        search_error: Some("down".to_string()),
        ..Default::default()
    });
    let (status, body) = send(app(backend), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ui-ae-graphiti-tracker");
    assert!(body["timestamp"].is_string());
}

// ===========================================================================
// TEST 10: GET /version
// ===========================================================================
#[tokio::test]
async fn test_version_endpoint() {
    let (status, body) = send(app(Arc::new(MemoryBackend::default())), "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

// ===========================================================================
// TEST 11: OPTIONS preflight is answered for any origin
// ===========================================================================
#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/actions/track")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let resp = app(Arc::new(MemoryBackend::default()))
        .oneshot(req)
        .await
        .unwrap();

    assert!(resp.status().is_success(), "got {}", resp.status());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(resp.headers().contains_key("access-control-allow-methods"));
}

// ===========================================================================
// TEST 12: a panicking handler becomes a 500 with kind "internal"
// ===========================================================================
#[tokio::test]
async fn test_panic_in_backend_is_internal_error() {
    let backend = Arc::new(MemoryBackend {
        panic_on_search: true,
        ..Default::default()
    });
    let (status, body) = send(app(backend), "POST", "/query", Some(json!({"query": "clicks"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "internal");
}

// ===========================================================================
// TEST 13: a stalled backend times out as 503 backend_unavailable
// ===========================================================================
#[tokio::test]
async fn test_stalled_backend_is_unavailable() {
    let backend = Arc::new(MemoryBackend {
        stall_search: true,
        ..Default::default()
    });
    let app = app_with_timeout(backend, Duration::from_millis(50));
    let (status, body) = send(app, "POST", "/query", Some(json!({"query": "clicks"}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "backend_unavailable");
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}
