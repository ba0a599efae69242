use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Playback status of the shared stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackStatus {
    Playing,
    Paused,
}

/// Owner-issued playback action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackAction {
    Play,
    Pause,
}

impl From<PlaybackAction> for PlaybackStatus {
    fn from(action: PlaybackAction) -> Self {
        match action {
            PlaybackAction::Play => Self::Playing,
            PlaybackAction::Pause => Self::Paused,
        }
    }
}

/// The single authoritative playback record.
///
/// Exactly one instance exists system-wide; every read and write goes
/// through the playback store, never a per-connection copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    /// Seconds offset into the stream, non-negative.
    pub position: f64,
    pub updated_at: DateTime<Utc>,
}

impl PlaybackState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Paused,
            position: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn apply_command(&mut self, action: PlaybackAction, time: f64) {
        self.status = action.into();
        self.position = time;
        self.updated_at = Utc::now();
    }

    pub fn seek(&mut self, time: f64) {
        self.position = time;
        self.updated_at = Utc::now();
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
