//! REST API Server for the Financial Query Orchestrator
//!
//! Exposes query answering, the market brief and the semantic index over HTTP.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::Orchestrator;
use crate::brief::BriefCache;
use crate::error::OrchestrationError;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentRequest {
    pub document: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiReply {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn failure(context: &str, e: OrchestrationError) -> ApiReply {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!(status = status.as_u16(), error = %e, "{} failed", context);
    (status, Json(ApiResponse::error(format!("{} failed: {}", context, e))))
}

fn require_text(field: &str, value: &str) -> Result<(), OrchestrationError> {
    if value.trim().is_empty() {
        return Err(OrchestrationError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub briefs: Arc<BriefCache>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoint
/// =============================

async fn ask(State(state): State<ApiState>, Json(req): Json<AskRequest>) -> ApiReply {
    if let Err(e) = require_text("query", &req.query) {
        return failure("Ask", e);
    }
    info!(query = %req.query, "Received query");

    match state.orchestrator.handle(&req.query).await {
        Ok(response) => ok(serde_json::json!({ "response": response })),
        Err(e) => failure("Ask", e),
    }
}

/// =============================
/// Market Brief Endpoints
/// =============================

async fn cached_market_brief(State(state): State<ApiState>) -> ApiReply {
    let brief = state.briefs.latest();
    ok(serde_json::json!({
        "brief": brief.text,
        "generated_at": brief.generated_at.map(|t| t.to_rfc3339()),
    }))
}

async fn generate_market_brief(State(state): State<ApiState>) -> ApiReply {
    match state.orchestrator.get_market_brief().await {
        Ok(brief) => ok(serde_json::json!({ "brief": brief })),
        Err(e) => failure("Market brief", e),
    }
}

/// =============================
/// Semantic Index Endpoints
/// =============================

async fn retrieve(State(state): State<ApiState>, Json(req): Json<RetrieveRequest>) -> ApiReply {
    if let Err(e) = require_text("query", &req.query) {
        return failure("Retrieve", e);
    }
    let gate = state.orchestrator.retrieval();
    let k = req.k.unwrap_or(state.orchestrator.policy().retrieval_k);

    match gate.retrieve(&req.query, k).await {
        Ok(retrieval) => ok(serde_json::json!({
            "content": retrieval.context,
            "confidence": retrieval.confidence.value(),
        })),
        Err(e) => failure("Retrieve", e),
    }
}

async fn add_document(
    State(state): State<ApiState>,
    Json(req): Json<AddDocumentRequest>,
) -> ApiReply {
    if let Err(e) = require_text("document", &req.document) {
        return failure("Add document", e);
    }

    match state.orchestrator.retrieval().add_documents(&[req.document]).await {
        Ok(added) => {
            info!(added, "Document indexed");
            ok(serde_json::json!({ "added": added }))
        }
        Err(e) => failure("Add document", e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/get_market_brief", get(cached_market_brief))
        .route("/market_brief", post(generate_market_brief))
        .route("/retrieve", post(retrieve))
        .route("/add_document", post(add_document))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState, port: u16) -> crate::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
