//! Wire messages exchanged over the real-time channel.
//!
//! JSON text frames with a discriminated `type` tag, `data` payload.

use serde::{Deserialize, Serialize};

use super::playback::{PlaybackAction, PlaybackStatus};

/// A play/pause command carrying the position it was issued at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackCommand {
    pub action: PlaybackAction,
    /// Seconds offset the owner's player was at when issuing the command.
    pub time: f64,
}

/// Messages a client may send to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Play/pause command. Requires the owner capability; broadcast to
    /// every other connection when accepted.
    Command(PlaybackCommand),
    /// Bare position keep-alive. Requires the owner capability; updates
    /// the authoritative position without any broadcast.
    PositionUpdate { time: f64 },
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Current playback state, sent once immediately after connect.
    Snapshot { status: PlaybackStatus, position: f64 },
    /// An accepted command, fanned out to all connections except the
    /// one that issued it.
    Command(PlaybackCommand),
}
