//! Playback state store service
//!
//! Owns the single durable playback record. Reads fall back to the
//! default paused-at-zero state, which is written through on first
//! access so later reads are stable even against an empty backend.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::PlaybackState;
use crate::store::StateBackend;
use crate::Result;

/// Playback state store.
///
/// `get`/`set` map one-to-one onto the backend key. `update` is the
/// read-modify-write composition, serialized behind a mutex so two
/// concurrent owner sessions cannot clobber each other's writes.
#[derive(Clone)]
pub struct PlaybackService {
    backend: Arc<dyn StateBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for PlaybackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackService").finish()
    }
}

impl PlaybackService {
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the authoritative playback state.
    ///
    /// If the backend holds no record yet, the default state is
    /// persisted and returned (first read initializes).
    pub async fn get(&self) -> Result<PlaybackState> {
        match self.backend.read().await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => {
                let state = PlaybackState::new();
                self.set(&state).await?;
                tracing::debug!("Initialized playback state with default record");
                Ok(state)
            }
        }
    }

    /// Full overwrite of the playback record.
    ///
    /// Returns `Err` if the backend write did not durably happen; the
    /// caller must not act as if the state changed.
    pub async fn set(&self, state: &PlaybackState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        self.backend.write(&raw).await
    }

    /// Read-modify-write under the write lock.
    pub async fn update<F>(&self, update_fn: F) -> Result<PlaybackState>
    where
        F: FnOnce(&mut PlaybackState),
    {
        let _guard = self.write_lock.lock().await;

        let mut state = self.get().await?;
        update_fn(&mut state);
        self.set(&state).await?;

        Ok(state)
    }
}
