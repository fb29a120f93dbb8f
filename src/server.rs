//! JSON HTTP API over the orchestrator.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/status` | Whether a context is loaded, and when it was synced |
//! | `POST` | `/api/sync` | Rebuild the context from the data store |
//! | `POST` | `/api/ask` | Answer `{ "message": "..." }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "No message" } }
//! ```
//!
//! Requests are serialized through one async mutex: each sync or question
//! runs to completion before the next one starts.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::orchestrator::Orchestrator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Mutex<Orchestrator>>,
}

/// Sync once, then serve until the process is terminated.
pub async fn run_server(config: &Config, mut orchestrator: Orchestrator) -> anyhow::Result<()> {
    match orchestrator.sync().await {
        Ok(summary) => tracing::info!(
            table = %summary.table,
            records = summary.records,
            "initial sync complete"
        ),
        Err(e) => tracing::warn!(error = %e, "initial sync failed; serving without context"),
    }

    let app = router(orchestrator);

    tracing::info!(bind = %config.server.bind, "server listening");
    println!("Listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Exposed separately so tests can serve it on any port.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = AppState {
        orchestrator: Arc::new(Mutex::new(orchestrator)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/status", get(handle_status))
        .route("/api/sync", post(handle_sync))
        .route("/api/ask", post(handle_ask))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/status ============

#[derive(Serialize)]
struct StatusResponse {
    has_context: bool,
    context_chars: usize,
    /// RFC 3339 timestamp of the last successful sync.
    last_sync: Option<String>,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let orchestrator = state.orchestrator.lock().await;
    let session = orchestrator.session();
    Json(StatusResponse {
        has_context: session.has_context(),
        context_chars: session.context().chars().count(),
        last_sync: session.last_sync().map(|t| t.to_rfc3339()),
    })
}

// ============ POST /api/sync ============

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
}

async fn handle_sync(State(state): State<AppState>) -> Json<SyncResponse> {
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.sync().await {
        Ok(summary) => Json(SyncResponse {
            success: true,
            message: "Database synced".to_string(),
            records: Some(summary.records),
        }),
        Err(_) => Json(SyncResponse {
            success: false,
            message: "Sync failed".to_string(),
            records: None,
        }),
    }
}

// ============ POST /api/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    response: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) =
        body.map_err(|e| bad_request(format!("Invalid request body: {}", e.body_text())))?;
    let message = req.message.as_deref().unwrap_or_default().trim();
    if message.is_empty() {
        return Err(bad_request("No message"));
    }

    let mut orchestrator = state.orchestrator.lock().await;
    let response = orchestrator.ask(message).await;
    Ok(Json(AskResponse { response }))
}
