//! Connection registry: one live transport per identity.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::MessageCoordinator;
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, PlayerId, ServerMessage};

#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub connection_id: ConnectionId,
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    /// Cancelling this closes the transport.
    pub cancel: CancellationToken,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(
        connection_id: ConnectionId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection_id,
            sender,
            cancel,
            connected_at: Utc::now(),
        }
    }
}

pub struct ConnectionRegistry {
    records: DashMap<PlayerId, ConnectionRecord>,
    metrics: Arc<ServerMetrics>,
}

impl ConnectionRegistry {
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            records: DashMap::new(),
            metrics,
        }
    }

    /// Install `record` as the identity's transport. A previous transport for the same identity
    /// is told it was displaced, then force-closed, and returned.
    pub fn register(&self, player_id: &str, record: ConnectionRecord) -> Option<ConnectionRecord> {
        let connection_id = record.connection_id;
        let previous = self.records.insert(player_id.to_string(), record)?;
        if previous.connection_id == connection_id {
            return None;
        }

        self.metrics.increment_connections_displaced();
        info!(
            %player_id,
            old_connection = %previous.connection_id,
            new_connection = %connection_id,
            "Displacing duplicate connection"
        );
        let notices = [
            ServerMessage::ConnectionDisplaced {
                message: "This account was opened in another window.".to_string(),
                reason: "duplicate_connection".to_string(),
            },
            ServerMessage::RemoveDuplicate,
        ];
        for notice in notices {
            if previous.sender.try_send(Arc::new(notice)).is_err() {
                debug!(%player_id, "Displaced transport did not accept notice");
            }
        }
        previous.cancel.cancel();
        Some(previous)
    }

    /// Remove the identity's record, but only if it still belongs to `connection_id`.
    pub fn unregister(&self, player_id: &str, connection_id: ConnectionId) -> bool {
        self.records
            .remove_if(player_id, |_, record| record.connection_id == connection_id)
            .is_some()
    }

    /// Whether `connection_id` is the identity's authoritative transport.
    pub fn is_current(&self, player_id: &str, connection_id: ConnectionId) -> bool {
        self.records
            .get(player_id)
            .is_some_and(|record| record.connection_id == connection_id)
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        self.records.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Close every transport and forget them.
    pub fn close_all(&self) -> usize {
        let records: Vec<ConnectionRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.records.clear();
        for record in &records {
            record.cancel.cancel();
        }
        records.len()
    }

    fn sender(&self, player_id: &str) -> Option<mpsc::Sender<Arc<ServerMessage>>> {
        self.records.get(player_id).map(|record| record.sender.clone())
    }
}

#[async_trait::async_trait]
impl MessageCoordinator for ConnectionRegistry {
    async fn send_to_player(
        &self,
        player_id: &str,
        message: Arc<ServerMessage>,
    ) -> anyhow::Result<()> {
        let Some(sender) = self.sender(player_id) else {
            debug!(%player_id, event = message.event_name(), "No live transport; message not sent");
            return Ok(());
        };
        match sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                self.metrics.increment_websocket_messages_dropped();
                warn!(%player_id, event = message.event_name(), "Outbound queue full; message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%player_id, "Transport closed before delivery");
            }
        }
        Ok(())
    }

    fn is_connected(&self, player_id: &str) -> bool {
        ConnectionRegistry::is_connected(self, player_id)
    }
}
