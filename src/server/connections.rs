use super::{ClientConnection, DuelServer, ProtocolViolation};
use crate::coordination::ConnectionRecord;
use crate::protocol::{validation, ClientMessage, PlayerId, ServerMessage};

/// Outcome of checking an event against the transport's identity binding.
pub(crate) enum Authorization {
    Allowed(PlayerId),
    /// The transport was displaced; drop the event silently.
    Stale,
    Rejected(ProtocolViolation),
}

impl DuelServer {
    /// A transport opened. It stays anonymous until its first identity-bearing event.
    pub fn connect(&self, connection: &ClientConnection) {
        self.metrics.increment_connections();
        self.reply(
            connection,
            ServerMessage::Connected {
                connection_id: connection.connection_id,
            },
        );
        tracing::debug!(connection_id = %connection.connection_id, "Transport connected");
    }

    pub(crate) async fn authorize(
        &self,
        connection: &mut ClientConnection,
        message: &ClientMessage,
    ) -> Authorization {
        if let Some(bound) = connection.player_id.clone() {
            if !self.registry.is_current(&bound, connection.connection_id) {
                self.metrics.increment_stale_messages_ignored();
                tracing::debug!(player_id = %bound, "Ignoring event from displaced transport");
                return Authorization::Stale;
            }
            return match message.asserted_identity() {
                Some(asserted) if asserted != bound => {
                    Authorization::Rejected(ProtocolViolation::IdentityMismatch)
                }
                _ => Authorization::Allowed(bound),
            };
        }

        let Some(asserted) = message.asserted_identity() else {
            return Authorization::Rejected(ProtocolViolation::NotIdentified);
        };
        if !message.binds_identity() {
            return Authorization::Rejected(ProtocolViolation::NotIdentified);
        }
        if let Err(reason) =
            validation::validate_player_id_with_config(asserted, &self.config.protocol)
        {
            return Authorization::Rejected(ProtocolViolation::InvalidInput(reason));
        }

        let player_id = asserted.to_string();
        self.bind(connection, player_id.clone()).await;
        Authorization::Allowed(player_id)
    }

    /// Make this transport the identity's only live record.
    ///
    /// Displacing an older transport counts as that transport closing: its queue entry is
    /// dropped and a live session starts the grace period, which the new transport's
    /// `join_game` cancels.
    async fn bind(&self, connection: &mut ClientConnection, player_id: PlayerId) {
        let record = ConnectionRecord::new(
            connection.connection_id,
            connection.sender.clone(),
            connection.cancel.clone(),
        );
        let displaced = self.registry.register(&player_id, record).is_some();
        tracing::info!(%player_id, connection_id = %connection.connection_id, "Transport bound to player");
        connection.player_id = Some(player_id.clone());
        if !displaced {
            return;
        }

        if self.queue.dequeue(&player_id).is_some() {
            self.metrics.set_queue_size(self.queue.len());
            tracing::info!(%player_id, "Removed queue entry of displaced transport");
        }
        if let Some(session) = self.sessions.session_of(&player_id) {
            session.disconnected(&player_id).await;
        }
    }

    /// The transport closed. Only the identity's current transport triggers recovery.
    pub async fn disconnect(&self, connection: &ClientConnection) {
        self.metrics.decrement_active_connections();
        let Some(player_id) = connection.player_id.as_deref() else {
            return;
        };
        if !self.registry.unregister(player_id, connection.connection_id) {
            tracing::debug!(%player_id, "Displaced transport closed");
            return;
        }

        if self.queue.dequeue(player_id).is_some() {
            self.metrics.increment_queue_leaves();
            self.metrics.set_queue_size(self.queue.len());
        }
        if let Some(session) = self.sessions.session_of(player_id) {
            session.disconnected(player_id).await;
        }
        tracing::info!(%player_id, "Player disconnected");
    }
}
