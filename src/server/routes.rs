//! Axum route handlers for the soulnet HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`                — Returns `{"status": "ok", "version": "...", "service": "soulnet"}`
//! - `POST /api/snapshots/upload`  — Store an envelope, returns `{"ok": true, "cid": "..."}`
//! - `GET  /api/snapshots/:cid`    — Fetch the bare envelope
//! - `POST /api/chain/commit`      — Point a soul address at a CID (last write wins)
//! - `GET  /api/chain/last`        — Latest `{cid, ts}` for `?soulAddress=`
//! - `POST /api/chat`              — Forward a conversation to the completion backend

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::{ChatReply, ChatRequest, CompletionBackend, OpenRouterBackend};
use crate::config::ServerConfig;
use crate::error::SoulError;
use crate::identity::SoulAddress;
use crate::registry::{CommitReceipt, FsRegistry, MemoryRegistry, ReferenceRegistry};
use crate::snapshots::{Cid, FsSnapshotStore, MemorySnapshotStore, SnapshotStore};
use crate::vault::Envelope;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn registry_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "ok": false, "error": message.into() })))
}

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Envelope storage behind `/api/snapshots`.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Address → CID records behind `/api/chain`.
    pub registry: Arc<dyn ReferenceRegistry>,
    /// Completion backend behind `/api/chat`; `None` when not configured.
    pub chat: Option<Arc<dyn CompletionBackend>>,
}

impl AppState {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        registry: Arc<dyn ReferenceRegistry>,
        chat: Option<Arc<dyn CompletionBackend>>,
    ) -> Self {
        Self {
            snapshots,
            registry,
            chat,
        }
    }

    /// File-system stores under the configured data root, OpenRouter if a key is set.
    pub fn from_config(config: &ServerConfig) -> Self {
        let chat = config
            .openrouter
            .clone()
            .map(|c| Arc::new(OpenRouterBackend::new(c)) as Arc<dyn CompletionBackend>);
        Self::new(
            Arc::new(FsSnapshotStore::new(config.data.snapshots_dir())),
            Arc::new(FsRegistry::new(config.data.chain_dir())),
            chat,
        )
    }

    /// Process-local stores and no completion backend.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MemoryRegistry::new()),
            None,
        )
    }

    pub fn with_chat(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.chat = Some(backend);
        self
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/snapshots/upload", post(upload_snapshot_handler))
        .route("/api/snapshots/:cid", get(download_snapshot_handler))
        .route("/api/chain/commit", post(commit_handler))
        .route("/api/chain/last", get(last_handler))
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body as JSON, or `null` when it does not parse.
fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "soulnet",
    }))
}

// ---------------------------------------------------------------------------
// Snapshot handlers
// ---------------------------------------------------------------------------

/// POST /api/snapshots/upload — store one envelope.
///
/// Accepts `{"snapshot": envelope}`, `{"blob": envelope}` or a bare envelope.
async fn upload_snapshot_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let candidate = match json_body(&body) {
        Value::Object(mut map) if map.contains_key("snapshot") => {
            map.remove("snapshot").unwrap_or(Value::Null)
        }
        Value::Object(mut map) if map.contains_key("blob") => {
            map.remove("blob").unwrap_or(Value::Null)
        }
        other => other,
    };

    let envelope = Envelope::from_value(candidate)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Missing blob"))?;

    match state.snapshots.upload(&envelope).await {
        Ok(cid) => Ok(Json(json!({ "ok": true, "cid": cid }))),
        Err(SoulError::MalformedEnvelope(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "Missing blob"))
        }
        Err(e) => {
            tracing::error!("Snapshot upload failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /api/snapshots/:cid — return the bare envelope.
async fn download_snapshot_handler(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<Envelope>, ApiError> {
    let cid = Cid::parse(&cid).map_err(|_| api_error(StatusCode::NOT_FOUND, "Not found"))?;

    match state.snapshots.download(&cid).await {
        Ok(envelope) => Ok(Json(envelope)),
        Err(SoulError::NotFound(_)) => Err(api_error(StatusCode::NOT_FOUND, "Not found")),
        Err(e) => {
            tracing::error!("Snapshot {} unreadable: {}", cid, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Registry handlers
// ---------------------------------------------------------------------------

/// POST /api/chain/commit — `{"soulAddress": "0x...", "cid": "..."}`.
async fn commit_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CommitReceipt>, ApiError> {
    let body = json_body(&body);
    let field = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let (Some(address), Some(cid)) = (field("soulAddress"), field("cid")) else {
        return Err(registry_error(
            StatusCode::BAD_REQUEST,
            "Missing soulAddress or cid",
        ));
    };

    let address = SoulAddress::parse(&address)
        .map_err(|e| registry_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let cid = Cid::parse(&cid).map_err(|e| registry_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let record = state.registry.commit(&address, &cid).await.map_err(|e| {
        tracing::error!("Commit for {} failed: {}", address.short(), e);
        registry_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(CommitReceipt::new(address, record)))
}

/// GET /api/chain/last?soulAddress=0x... — latest record.
async fn last_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let raw = params
        .get("soulAddress")
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| registry_error(StatusCode::BAD_REQUEST, "Missing soulAddress"))?;
    let address = SoulAddress::parse(raw)
        .map_err(|e| registry_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.registry.lookup_latest(&address).await {
        Ok(record) => Ok(Json(json!({
            "ok": true,
            "soulAddress": address,
            "cid": record.cid,
            "ts": record.ts,
        }))),
        Err(SoulError::NotFound(_)) => Err(registry_error(StatusCode::NOT_FOUND, "Not found")),
        Err(e) => {
            tracing::error!("Lookup for {} failed: {}", address.short(), e);
            Err(registry_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Chat handler
// ---------------------------------------------------------------------------

/// POST /api/chat — `{"messages": [...], "soul": {...}}` → `{"message": {...}}`.
async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let backend = state.chat.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Missing OPENROUTER_API_KEY in environment",
        )
    })?;

    let request = ChatRequest::from_value_lenient(&json_body(&body));
    let message = backend.complete(&request).await.map_err(|e| {
        let message = match e {
            SoulError::Completion(m) => m,
            other => other.to_string(),
        };
        api_error(StatusCode::INTERNAL_SERVER_ERROR, message)
    })?;

    Ok(Json(ChatReply { message }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
