//! WebSocket handler for the shared playback session
//!
//! The owner capability is resolved from the token query parameter
//! before the upgrade and frozen for the connection's lifetime. After
//! the upgrade the socket is split: a spawned task pumps hub events to
//! the sink, the handler loop feeds inbound frames to the hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use cinesync_core::models::ClientMessage;

use super::AppState;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Owner token; absent or wrong means a view-only connection.
    pub token: Option<String>,
}

/// WebSocket handler for real-time playback sync
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Capability resolved once, before the upgrade; immutable afterwards.
    let is_owner = state.owner_auth.resolve(query.token.as_deref());

    ws.on_upgrade(move |socket| handle_socket(socket, state, is_owner))
}

async fn handle_socket(socket: WebSocket, state: AppState, is_owner: bool) {
    let (connection_id, mut events) = match state.hub.subscribe(is_owner).await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Rejecting WebSocket connection, no snapshot available: {e}");
            return;
        }
    };

    info!(
        connection_id = %connection_id,
        is_owner = is_owner,
        "WebSocket connection established"
    );

    let (mut sink, mut stream) = socket.split();

    // Hub events -> socket. Ends when the hub drops the sender
    // (unsubscribe) or the peer goes away.
    let writer_id = connection_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(connection_id = %writer_id, "Failed to encode event: {e}");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                // Non-fatal delivery failure: the peer is gone, the
                // read loop will observe it and clean up.
                debug!(connection_id = %writer_id, "WebSocket send failed: {e}");
                break;
            }
        }
    });

    // Socket -> hub.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let message: ClientMessage = match serde_json::from_str(text.as_str()) {
                    Ok(message) => message,
                    Err(e) => {
                        debug!(
                            connection_id = %connection_id,
                            "Ignoring malformed client frame: {e}"
                        );
                        continue;
                    }
                };

                if let Err(e) = state.hub.handle_message(&connection_id, message).await {
                    // Recoverable for this connection; the client may retry.
                    warn!(
                        connection_id = %connection_id,
                        "Failed to apply client message: {e}"
                    );
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Binary, ping and pong frames carry no playback intent.
            }
            Err(e) => {
                debug!(connection_id = %connection_id, "WebSocket error: {e}");
                break;
            }
        }
    }

    // Remove from the live set before returning so no further fan-out
    // targets this connection; dropping the sender ends the writer.
    state.hub.unsubscribe(&connection_id);
    writer.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}
