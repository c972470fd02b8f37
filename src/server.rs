//! HTTP server: the webhook endpoint plus a health probe.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::telegram::Update;

/// Shared application state.
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET /api/health - liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /webhook - one Bot API update per request.
///
/// Always answers 200: a non-2xx status makes the platform redeliver the
/// update, and failed intents are already reported to the actor by the
/// dispatcher. Redeliveries that slip through are absorbed by the
/// workflow's idempotent submit.
async fn webhook(State(state): State<Arc<AppState>>, Json(update): Json<Update>) -> StatusCode {
    state.dispatcher.handle_update(&update).await;
    StatusCode::OK
}
