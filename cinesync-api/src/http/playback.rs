//! Read-only playback state endpoint

use axum::{extract::State, Json};
use cinesync_core::models::PlaybackState;

use super::error::AppResult;
use super::AppState;

/// `GET /api/playback` — current authoritative snapshot. Ungated: every
/// caller may observe state.
pub async fn get_playback(State(state): State<AppState>) -> AppResult<Json<PlaybackState>> {
    let snapshot = state.hub.playback().get().await?;
    Ok(Json(snapshot))
}
