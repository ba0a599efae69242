//! Liveness and readiness probes

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;

use super::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready when the playback store answers; the listing path degrades on
/// its own and never blocks readiness.
async fn ready(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.hub.playback().get().await {
        Ok(_) => Ok(Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!("Readiness probe failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
