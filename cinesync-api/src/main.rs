mod http;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cinesync_core::hub::PlaybackHub;
use cinesync_core::service::{LibraryService, OwnerAuth, PlaybackService};
use cinesync_core::store::{MemoryBackend, RedisBackend, StateBackend};
use cinesync_core::{logging, Config};

#[derive(Debug, Parser)]
#[command(name = "cinesync-api", about = "Shared playback sync server")]
struct Args {
    /// Path to the configuration file
    #[arg(long, env = "CINESYNC_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    logging::init_logging(&config.logging)?;

    info!("CineSync API server starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Media root: {}", config.media.media_dir);

    let backend = build_state_backend(&config).await?;
    let playback = PlaybackService::new(backend);
    let hub = PlaybackHub::new(playback);
    info!("Playback hub initialized");

    let library = LibraryService::new(&config.media.media_dir, &config.media.run_dir);

    let owner_auth = OwnerAuth::new(&config.auth.owner_token);
    if config.auth.owner_token.is_empty() {
        warn!("No owner token configured: every connection is view-only");
    }

    let router = http::create_router(hub, library, owner_auth);

    let listener = tokio::net::TcpListener::bind(config.http_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.http_address()))?;
    info!("HTTP server listening on {}", config.http_address());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

/// Pick the playback state backend.
///
/// A configured Redis URL must connect; failing over to process memory
/// would silently drop the durability contract. An empty URL is the
/// explicit opt-in to single-node, in-memory state.
async fn build_state_backend(config: &Config) -> Result<Arc<dyn StateBackend>> {
    if config.redis.url.is_empty() {
        warn!("Redis URL not configured, playback state will not survive restarts");
        return Ok(Arc::new(MemoryBackend::new()));
    }

    info!("Connecting to Redis: {}", config.redis.url);
    let client = redis::Client::open(config.redis.url.as_str())
        .context("Invalid Redis URL")?;

    let manager = tokio::time::timeout(
        Duration::from_secs(config.redis.connect_timeout_seconds),
        client.get_connection_manager(),
    )
    .await
    .context("Timed out connecting to Redis")?
    .context("Failed to connect to Redis")?;

    info!("Redis connected");
    Ok(Arc::new(RedisBackend::new(manager, &config.redis.key_prefix)))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!("Failed to listen for shutdown signal: {e}"),
    }
}
