//! HTTP server for Paperchat.
//!
//! Serves the embedded chat UI at `/` and the session API under `/v1`.
//! Built on Axum.

pub mod api;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use paperchat_agent::ChatEngine;
use paperchat_config::AppConfig;
use paperchat_documents::DocumentReader;
use paperchat_memory::SessionStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Multipart framing overhead allowed on top of the upload limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub engine: ChatEngine,
    pub sessions: SessionStore,
    pub max_upload_bytes: usize,
}

impl GatewayState {
    pub fn new(engine: ChatEngine, sessions: SessionStore, max_upload_bytes: usize) -> Self {
        Self {
            engine,
            sessions,
            max_upload_bytes,
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: health check, `/v1` API and the frontend.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire up the backend, extractor and session store from `config`, then
/// serve until the process is stopped.
pub async fn start(config: AppConfig) -> paperchat_core::Result<()> {
    config.validate().map_err(|e| paperchat_core::Error::Config {
        message: e.to_string(),
    })?;
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let backend = paperchat_providers::build_from_config(&config)?;
    let engine = ChatEngine::from_config(&config, backend, Arc::new(DocumentReader::new()));
    let sessions = SessionStore::new(config.memory.max_messages, config.memory.max_sessions);

    let state = Arc::new(GatewayState::new(
        engine,
        sessions,
        config.documents.max_upload_bytes,
    ));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        model = %config.model_name,
        max_messages = config.memory.max_messages,
        "Paperchat listening on http://{addr}"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
