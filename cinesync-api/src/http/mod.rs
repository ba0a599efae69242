// Module: http
// HTTP/JSON API plus the WebSocket sync endpoint

pub mod error;
pub mod health;
pub mod playback;
pub mod videos;
pub mod ws;

use axum::{routing::get, Router};
use cinesync_core::hub::PlaybackHub;
use cinesync_core::service::{LibraryService, OwnerAuth};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: PlaybackHub,
    pub library: LibraryService,
    pub owner_auth: OwnerAuth,
}

/// Create the HTTP router with all routes
pub fn create_router(hub: PlaybackHub, library: LibraryService, owner_auth: OwnerAuth) -> Router {
    let state = AppState {
        hub,
        library,
        owner_auth,
    };

    let router = Router::new()
        .merge(health::create_health_router())
        // Content listing and DASH delivery
        .route("/api/videos", get(videos::list_videos))
        .route("/api/videos/{name}/manifest.mpd", get(videos::get_manifest))
        .route("/api/videos/{name}/{file}", get(videos::get_segment))
        // Read-only playback snapshot
        .route("/api/playback", get(playback::get_playback))
        // WebSocket endpoint for real-time sync
        .route("/api/ws", get(ws::websocket_handler));

    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}
