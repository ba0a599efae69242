//! Broadcast hub for the shared playback session
//!
//! Registers live connections, gates mutation intents through the
//! authorization predicate, writes through the playback store, and fans
//! accepted commands out to every connection except the originator.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{ClientMessage, ConnectionId, PlaybackCommand, ServerEvent};
use crate::service::{auth, PlaybackService};
use crate::{Error, Result};

/// Immutable per-connection record, resolved at handshake time.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub is_owner: bool,
}

/// Message sender for a client connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

struct Subscriber {
    info: ConnectionInfo,
    sender: EventSender,
}

/// In-memory hub routing playback events to connected clients.
#[derive(Clone)]
pub struct PlaybackHub {
    connections: Arc<DashMap<ConnectionId, Subscriber>>,
    playback: PlaybackService,
}

impl PlaybackHub {
    #[must_use]
    pub fn new(playback: PlaybackService) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            playback,
        }
    }

    /// Access to the underlying playback store (read paths).
    #[must_use]
    pub fn playback(&self) -> &PlaybackService {
        &self.playback
    }

    /// Register a connection and deliver the current snapshot to it.
    ///
    /// The connection is inserted into the live set first, so the
    /// snapshot can never predate registration; a command accepted
    /// concurrently is delivered after it in the channel.
    pub async fn subscribe(
        &self,
        is_owner: bool,
    ) -> Result<(ConnectionId, mpsc::UnboundedReceiver<ServerEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let info = ConnectionInfo {
            id: ConnectionId::new(),
            is_owner,
        };
        let id = info.id.clone();

        self.connections.insert(
            id.clone(),
            Subscriber {
                info,
                sender: tx.clone(),
            },
        );

        let snapshot = match self.playback.get().await {
            Ok(state) => state,
            Err(e) => {
                // No snapshot means no usable session; roll back the
                // registration and fail the connect.
                self.connections.remove(&id);
                return Err(e);
            }
        };

        if tx
            .send(ServerEvent::Snapshot {
                status: snapshot.status,
                position: snapshot.position,
            })
            .is_err()
        {
            self.connections.remove(&id);
            return Err(Error::Internal("Receiver dropped during subscribe".into()));
        }

        info!(
            connection_id = %id,
            is_owner = is_owner,
            connection_count = self.connections.len(),
            "Client subscribed"
        );

        Ok((id, rx))
    }

    /// Remove a connection from the live set.
    ///
    /// Synchronous with the disconnect: once this returns, no fan-out
    /// targets the connection.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) {
        if self.connections.remove(connection_id).is_some() {
            info!(
                connection_id = %connection_id,
                connection_count = self.connections.len(),
                "Client unsubscribed"
            );
        } else {
            warn!(
                connection_id = %connection_id,
                "Attempted to unsubscribe unknown connection"
            );
        }
    }

    /// Dispatch one inbound client message by kind.
    pub async fn handle_message(
        &self,
        connection_id: &ConnectionId,
        message: ClientMessage,
    ) -> Result<()> {
        match message {
            ClientMessage::Command(command) => self.handle_command(connection_id, command).await,
            ClientMessage::PositionUpdate { time } => {
                self.handle_position_update(connection_id, time).await
            }
        }
    }

    /// Handle a play/pause command.
    ///
    /// Unauthorized senders are silently dropped: no state change, no
    /// broadcast, no error back. Accepted commands are written through
    /// the store before any fan-out; a failed write reaches the caller
    /// and nothing is broadcast.
    pub async fn handle_command(
        &self,
        connection_id: &ConnectionId,
        command: PlaybackCommand,
    ) -> Result<()> {
        let Some(info) = self.connection_info(connection_id) else {
            warn!(connection_id = %connection_id, "Command from unknown connection");
            return Ok(());
        };

        if !auth::is_privileged(&info) {
            debug!(
                connection_id = %connection_id,
                action = ?command.action,
                "Dropping command from unprivileged connection"
            );
            return Ok(());
        }

        if command.time < 0.0 {
            return Err(Error::InvalidInput(
                "Playback position must be non-negative".to_string(),
            ));
        }

        self.playback
            .update(|state| state.apply_command(command.action, command.time))
            .await?;

        let delivered = self.fan_out(connection_id, ServerEvent::Command(command));
        debug!(
            connection_id = %connection_id,
            action = ?command.action,
            time = command.time,
            delivered = delivered,
            "Command accepted and broadcast"
        );

        Ok(())
    }

    /// Handle a bare position keep-alive: authoritative position moves,
    /// nobody is notified.
    pub async fn handle_position_update(
        &self,
        connection_id: &ConnectionId,
        time: f64,
    ) -> Result<()> {
        let Some(info) = self.connection_info(connection_id) else {
            warn!(connection_id = %connection_id, "Position update from unknown connection");
            return Ok(());
        };

        if !auth::is_privileged(&info) {
            debug!(
                connection_id = %connection_id,
                "Dropping position update from unprivileged connection"
            );
            return Ok(());
        }

        if time < 0.0 {
            return Err(Error::InvalidInput(
                "Playback position must be non-negative".to_string(),
            ));
        }

        self.playback.update(|state| state.seek(time)).await?;
        Ok(())
    }

    /// Number of live connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn connection_info(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.connections
            .get(connection_id)
            .map(|sub| sub.info.clone())
    }

    /// Deliver an event to every registered connection except the
    /// originator. Senders are snapshotted first so no registry entry is
    /// locked while sending; dead receivers are cleaned up afterwards.
    fn fan_out(&self, originator: &ConnectionId, event: ServerEvent) -> usize {
        let targets: Vec<(ConnectionId, EventSender)> = self
            .connections
            .iter()
            .filter(|entry| entry.key() != originator)
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        let mut sent_count = 0;
        let mut failed_connections = Vec::new();

        for (id, sender) in targets {
            match sender.send(event.clone()) {
                Ok(()) => sent_count += 1,
                Err(err) => {
                    warn!(
                        connection_id = %id,
                        error = %err,
                        "Failed to deliver event, marking for cleanup"
                    );
                    failed_connections.push(id);
                }
            }
        }

        for id in failed_connections {
            self.unsubscribe(&id);
        }

        sent_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaybackAction, PlaybackStatus};
    use crate::store::{MemoryBackend, StateBackend};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn hub() -> PlaybackHub {
        let backend = Arc::new(MemoryBackend::new());
        PlaybackHub::new(PlaybackService::new(backend))
    }

    /// Backend whose writes can be switched to fail, as when Redis
    /// drops mid-session.
    #[derive(Clone)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_writes: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl StateBackend for FlakyBackend {
        async fn read(&self) -> crate::Result<Option<String>> {
            self.inner.read().await
        }

        async fn write(&self, value: &str) -> crate::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::StoreUnavailable("connection reset".into()));
            }
            self.inner.write(value).await
        }
    }

    async fn expect_silent(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        // Silent means no event arrived: either the timeout elapsed or the
        // channel closed empty (`Ok(None)`); `Ok(Some(_))` is a delivery.
        assert!(
            !matches!(received, Ok(Some(_))),
            "connection should not have received an event"
        );
    }

    #[tokio::test]
    async fn test_subscribe_receives_snapshot_once() {
        let hub = hub();
        let (_id, mut rx) = hub.subscribe(false).await.unwrap();

        match rx.recv().await.unwrap() {
            ServerEvent::Snapshot { status, position } => {
                assert_eq!(status, PlaybackStatus::Paused);
                assert_eq!(position, 0.0);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        expect_silent(&mut rx).await;
    }

    #[tokio::test]
    async fn test_snapshot_reflects_stored_state() {
        let hub = hub();
        hub.playback()
            .update(|s| s.apply_command(PlaybackAction::Play, 42.5))
            .await
            .unwrap();

        let (_id, mut rx) = hub.subscribe(false).await.unwrap();
        match rx.recv().await.unwrap() {
            ServerEvent::Snapshot { status, position } => {
                assert_eq!(status, PlaybackStatus::Playing);
                assert_eq!(position, 42.5);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_owner_command_fans_out_to_all_but_sender() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (_b, mut b_rx) = hub.subscribe(false).await.unwrap();
        let (_c, mut c_rx) = hub.subscribe(false).await.unwrap();

        // Drain snapshots.
        owner_rx.recv().await.unwrap();
        b_rx.recv().await.unwrap();
        c_rx.recv().await.unwrap();

        let command = PlaybackCommand {
            action: PlaybackAction::Play,
            time: 10.0,
        };
        hub.handle_command(&owner, command).await.unwrap();

        for rx in [&mut b_rx, &mut c_rx] {
            match rx.recv().await.unwrap() {
                ServerEvent::Command(received) => assert_eq!(received, command),
                other => panic!("expected command, got {other:?}"),
            }
            expect_silent(rx).await;
        }

        // The originator never hears its own command.
        expect_silent(&mut owner_rx).await;

        let state = hub.playback().get().await.unwrap();
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert_eq!(state.position, 10.0);
    }

    #[tokio::test]
    async fn test_viewer_command_is_silently_dropped() {
        let hub = hub();
        let (_owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (viewer, mut viewer_rx) = hub.subscribe(false).await.unwrap();
        let (_c, mut c_rx) = hub.subscribe(false).await.unwrap();

        owner_rx.recv().await.unwrap();
        viewer_rx.recv().await.unwrap();
        c_rx.recv().await.unwrap();

        let before = hub.playback().get().await.unwrap();

        hub.handle_command(
            &viewer,
            PlaybackCommand {
                action: PlaybackAction::Pause,
                time: 5.0,
            },
        )
        .await
        .unwrap();

        let after = hub.playback().get().await.unwrap();
        assert_eq!(before, after);

        expect_silent(&mut owner_rx).await;
        expect_silent(&mut viewer_rx).await;
        expect_silent(&mut c_rx).await;
    }

    #[tokio::test]
    async fn test_position_update_moves_position_without_broadcast() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (_viewer, mut viewer_rx) = hub.subscribe(false).await.unwrap();

        owner_rx.recv().await.unwrap();
        viewer_rx.recv().await.unwrap();

        hub.playback()
            .update(|s| s.apply_command(PlaybackAction::Play, 1.0))
            .await
            .unwrap();

        hub.handle_position_update(&owner, 77.0).await.unwrap();

        let state = hub.playback().get().await.unwrap();
        assert_eq!(state.position, 77.0);
        // Status untouched by a bare position update.
        assert_eq!(state.status, PlaybackStatus::Playing);

        expect_silent(&mut viewer_rx).await;
    }

    #[tokio::test]
    async fn test_viewer_position_update_is_dropped() {
        let hub = hub();
        let (viewer, mut viewer_rx) = hub.subscribe(false).await.unwrap();
        viewer_rx.recv().await.unwrap();

        let before = hub.playback().get().await.unwrap();
        hub.handle_position_update(&viewer, 123.0).await.unwrap();
        let after = hub.playback().get().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_negative_position_rejected() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        owner_rx.recv().await.unwrap();

        let result = hub
            .handle_command(
                &owner,
                PlaybackCommand {
                    action: PlaybackAction::Play,
                    time: -1.0,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let state = hub.playback().get().await.unwrap();
        assert_eq!(state.position, 0.0);
    }

    #[tokio::test]
    async fn test_failed_store_write_is_not_broadcast() {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let backend = FlakyBackend {
            inner: MemoryBackend::new(),
            fail_writes: fail_writes.clone(),
        };
        let hub = PlaybackHub::new(PlaybackService::new(Arc::new(backend)));

        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (_viewer, mut viewer_rx) = hub.subscribe(false).await.unwrap();
        owner_rx.recv().await.unwrap();
        viewer_rx.recv().await.unwrap();

        let before = hub.playback().get().await.unwrap();
        fail_writes.store(true, Ordering::SeqCst);

        let result = hub
            .handle_command(
                &owner,
                PlaybackCommand {
                    action: PlaybackAction::Play,
                    time: 10.0,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));

        // No viewer heard about the command that never durably happened.
        expect_silent(&mut viewer_rx).await;

        // The stored record is the one from before the failed write.
        fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(hub.playback().get().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unsubscribed_connection_is_never_a_target() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (viewer, mut viewer_rx) = hub.subscribe(false).await.unwrap();

        owner_rx.recv().await.unwrap();
        viewer_rx.recv().await.unwrap();

        hub.unsubscribe(&viewer);
        assert_eq!(hub.connection_count(), 1);

        hub.handle_command(
            &owner,
            PlaybackCommand {
                action: PlaybackAction::Play,
                time: 3.0,
            },
        )
        .await
        .unwrap();

        expect_silent(&mut viewer_rx).await;
    }

    #[tokio::test]
    async fn test_dead_receiver_is_cleaned_up_on_fan_out() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        let (_viewer, viewer_rx) = hub.subscribe(false).await.unwrap();

        owner_rx.recv().await.unwrap();
        drop(viewer_rx);

        hub.handle_command(
            &owner,
            PlaybackCommand {
                action: PlaybackAction::Play,
                time: 1.0,
            },
        )
        .await
        .unwrap();

        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_message_dispatch() {
        let hub = hub();
        let (owner, mut owner_rx) = hub.subscribe(true).await.unwrap();
        owner_rx.recv().await.unwrap();

        hub.handle_message(
            &owner,
            ClientMessage::Command(PlaybackCommand {
                action: PlaybackAction::Play,
                time: 8.0,
            }),
        )
        .await
        .unwrap();

        hub.handle_message(&owner, ClientMessage::PositionUpdate { time: 9.0 })
            .await
            .unwrap();

        let state = hub.playback().get().await.unwrap();
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert_eq!(state.position, 9.0);
    }
}
