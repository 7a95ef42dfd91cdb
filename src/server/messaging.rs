use super::{ClientConnection, DuelServer, ProtocolViolation};
use crate::protocol::{ErrorCode, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

impl DuelServer {
    pub(crate) async fn send_to_player(&self, player_id: &str, message: ServerMessage) {
        if let Err(err) = self
            .coordinator
            .send_to_player(player_id, Arc::new(message))
            .await
        {
            tracing::warn!(%player_id, %err, "Failed to deliver message");
        }
    }

    /// Send an error message to a specific player.
    pub async fn send_error_to_player(
        &self,
        player_id: &str,
        error_code: ErrorCode,
        message: impl Into<String>,
    ) {
        self.send_to_player(player_id, ServerMessage::error(error_code, message))
            .await;
    }

    pub(crate) async fn report_violation(&self, player_id: &str, violation: &ProtocolViolation) {
        self.metrics.increment_protocol_errors();
        tracing::debug!(%player_id, error = %violation, "Request rejected");
        self.send_error_to_player(player_id, violation.error_code(), violation.to_string())
            .await;
    }

    /// Reply on the transport itself, bypassing the registry. Used before an identity is bound.
    pub(crate) fn reply(&self, connection: &ClientConnection, message: ServerMessage) {
        match connection.sender.try_send(Arc::new(message)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.increment_websocket_messages_dropped();
                tracing::warn!(connection_id = %connection.connection_id, "Outbound queue full; reply dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
