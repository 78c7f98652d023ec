//! Transport fan-out.
//!
//! The engine and coordinator push state through a [`ConnectionSink`] and
//! never wait on delivery: sends are fire-and-forget, and a recipient
//! whose channel is gone is silently dropped from the registry. The
//! WebSocket layer drains the receivers.

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ServerMessage;
use crate::engine::PlayerId;

const LOG_TARGET: &str = "sink";

pub trait ConnectionSink: Send + Sync {
    fn send_to_player(&self, player_id: &PlayerId, message: &ServerMessage);
    fn broadcast_to_viewers(&self, message: &ServerMessage);
    fn broadcast_to_admins(&self, message: &ServerMessage);
}

/// Discards everything. Useful for tests that only care about game state.
pub struct NullSink;

impl ConnectionSink for NullSink {
    fn send_to_player(&self, _player_id: &PlayerId, _message: &ServerMessage) {}
    fn broadcast_to_viewers(&self, _message: &ServerMessage) {}
    fn broadcast_to_admins(&self, _message: &ServerMessage) {}
}

/// Channel-backed sink: one unbounded channel per player connection plus
/// viewer and admin pools.
#[derive(Default)]
pub struct ChannelSink {
    players: DashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>,
    viewers: RwLock<Vec<mpsc::UnboundedSender<ServerMessage>>>,
    admins: RwLock<Vec<mpsc::UnboundedSender<ServerMessage>>>,
}

impl ChannelSink {
    pub fn new() -> ChannelSink {
        ChannelSink::default()
    }

    /// Attach a player connection, replacing any previous one.
    pub fn connect_player(&self, player_id: PlayerId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.players.insert(player_id, tx);
        debug!(target: LOG_TARGET, player = %player_id, "player connected");
        rx
    }

    pub fn disconnect_player(&self, player_id: &PlayerId) {
        if self.players.remove(player_id).is_some() {
            debug!(target: LOG_TARGET, player = %player_id, "player disconnected");
        }
    }

    pub fn is_player_connected(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn connect_viewer(&self) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.viewers.write().push(tx);
        rx
    }

    pub fn connect_admin(&self) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.admins.write().push(tx);
        rx
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.read().len()
    }

    fn fan_out(pool: &RwLock<Vec<mpsc::UnboundedSender<ServerMessage>>>, message: &ServerMessage) {
        let mut pool = pool.write();
        let before = pool.len();
        pool.retain(|tx| tx.send(message.clone()).is_ok());
        if pool.len() < before {
            debug!(
                target: LOG_TARGET,
                dropped = before - pool.len(),
                "dropped dead broadcast recipients"
            );
        }
    }
}

impl ConnectionSink for ChannelSink {
    fn send_to_player(&self, player_id: &PlayerId, message: &ServerMessage) {
        let dead = match self.players.get(player_id) {
            Some(tx) => tx.send(message.clone()).is_err(),
            None => false,
        };
        if dead {
            self.players.remove(player_id);
            warn!(target: LOG_TARGET, player = %player_id, "dropping dead player connection");
        }
    }

    fn broadcast_to_viewers(&self, message: &ServerMessage) {
        Self::fan_out(&self.viewers, message);
    }

    fn broadcast_to_admins(&self, message: &ServerMessage) {
        Self::fan_out(&self.admins, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn player_sends_reach_only_that_player() {
        let sink = ChannelSink::new();
        let a = PlayerId::new();
        let b = PlayerId::new();
        let mut rx_a = sink.connect_player(a);
        let mut rx_b = sink.connect_player(b);

        sink.send_to_player(&a, &ServerMessage::Pong);
        assert!(matches!(rx_a.try_recv(), Ok(ServerMessage::Pong)));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_viewer_is_dropped_and_broadcast_continues() {
        let sink = ChannelSink::new();
        let rx_dead = sink.connect_viewer();
        let mut rx_live = sink.connect_viewer();
        drop(rx_dead);

        sink.broadcast_to_viewers(&ServerMessage::Pong);
        assert!(matches!(rx_live.try_recv(), Ok(ServerMessage::Pong)));
        assert_eq!(sink.viewer_count(), 1);
    }

    #[tokio::test]
    async fn dead_player_connection_is_removed_on_send() {
        let sink = ChannelSink::new();
        let a = PlayerId::new();
        let rx = sink.connect_player(a);
        drop(rx);

        sink.send_to_player(&a, &ServerMessage::Pong);
        assert!(!sink.is_player_connected(&a));
    }
}
