//! actiongraph HTTP API
//!
//! Axum server exposing action tracking and graph queries. Handlers are thin:
//! extract, delegate to [`Tracker`], serialise.
//!
//! Endpoints:
//! - POST /actions/track     record a UI action
//! - POST /actions/result    record the outcome of an action
//! - POST /sessions/start    record a session start
//! - POST /sessions/end      record a session end (`?session_id=`)
//! - POST /query             search the graph
//! - GET  /health            liveness
//! - GET  /version           server version info

use std::sync::Arc;

use actiongraph_core::config::HttpConfig;
use actiongraph_core::models::{ActionResult, QueryRequest, Session, UIAction};
use actiongraph_core::ActionGraphError;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::tracker::{
    Acknowledged, ActionTracked, Health, QueryResults, SessionEvent, Tracker, SERVICE_NAME,
};

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub tracker: Tracker,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/actions/track", post(track_action_handler))
        .route("/actions/result", post(track_action_result_handler))
        .route("/sessions/start", post(start_session_handler))
        .route("/sessions/end", post(end_session_handler))
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .layer(CatchPanicLayer::custom(|_| {
            ApiError::Internal("request handler panicked".to_string()).into_response()
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on the configured address until the shutdown signal fires.
pub async fn start_http_server(
    config: &HttpConfig,
    tracker: Tracker,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ActionGraphError> {
    let addr = config.addr();
    let state = Arc::new(HttpState { tracker });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("actiongraph HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct EndSessionParams {
    pub session_id: String,
}

// ============================================================================
// Axum handlers
// ============================================================================

pub async fn track_action_handler(
    State(state): State<Arc<HttpState>>,
    Json(action): Json<UIAction>,
) -> Result<Json<ActionTracked>, ApiError> {
    state.tracker.track_action(action).await.map(Json)
}

pub async fn track_action_result_handler(
    State(state): State<Arc<HttpState>>,
    Json(result): Json<ActionResult>,
) -> Result<Json<Acknowledged>, ApiError> {
    state.tracker.track_action_result(result).await.map(Json)
}

pub async fn start_session_handler(
    State(state): State<Arc<HttpState>>,
    Json(session): Json<Session>,
) -> Result<Json<SessionEvent>, ApiError> {
    state.tracker.start_session(session).await.map(Json)
}

pub async fn end_session_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<EndSessionParams>,
) -> Result<Json<SessionEvent>, ApiError> {
    state.tracker.end_session(params.session_id).await.map(Json)
}

pub async fn query_handler(
    State(state): State<Arc<HttpState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResults>, ApiError> {
    state.tracker.query_graph(request).await.map(Json)
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> Json<Health> {
    Json(state.tracker.health())
}

pub async fn version_handler() -> impl IntoResponse {
    Json(version_inner())
}

/// Version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": SERVICE_NAME,
    })
}
