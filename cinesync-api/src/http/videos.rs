//! Content listing and DASH media delivery
//!
//! The listing is recomputed from filesystem evidence on every request.
//! Manifest and segment delivery are plain whole-file responses; the
//! manifest gets its DASH content type explicitly, segments are typed
//! by file suffix.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use cinesync_core::models::VideoEntry;

use super::error::{AppError, AppResult};
use super::AppState;

/// Content type for DASH manifests
const DASH_MANIFEST_CONTENT_TYPE: &str = "application/dash+xml";

/// `GET /api/videos` — list every item with its readiness state.
pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<VideoEntry>> {
    Json(state.library.list())
}

/// `GET /api/videos/{name}/manifest.mpd`
pub async fn get_manifest(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let path = state.library.manifest_path(&name)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::not_found(format!("No manifest for {name}")))?;

    Ok((
        [(header::CONTENT_TYPE, DASH_MANIFEST_CONTENT_TYPE)],
        bytes,
    )
        .into_response())
}

/// `GET /api/videos/{name}/{file}` — any file under the item directory,
/// content type guessed from the suffix.
pub async fn get_segment(
    State(state): State<AppState>,
    Path((name, file)): Path<(String, String)>,
) -> AppResult<Response> {
    let path = state.library.segment_path(&name, &file)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::not_found(format!("No such segment: {name}/{file}")))?;

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
