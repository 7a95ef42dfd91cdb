use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};

use super::connections::Authorization;
use super::{ClientConnection, DuelServer};

impl DuelServer {
    /// Handle one event from a transport.
    pub async fn handle_client_message(
        self: &Arc<Self>,
        connection: &mut ClientConnection,
        message: ClientMessage,
    ) {
        if matches!(message, ClientMessage::Ping) {
            self.reply(connection, ServerMessage::Pong);
            return;
        }

        let player_id = match self.authorize(connection, &message).await {
            Authorization::Allowed(player_id) => player_id,
            Authorization::Stale => return,
            Authorization::Rejected(violation) => {
                self.metrics.increment_protocol_errors();
                tracing::debug!(
                    connection_id = %connection.connection_id,
                    error = %violation,
                    "Rejected unauthorized event"
                );
                self.reply(
                    connection,
                    ServerMessage::error(violation.error_code(), violation.to_string()),
                );
                return;
            }
        };

        let result = match message {
            ClientMessage::JoinQueue {
                player,
                difficulties,
            } => self.handle_join_queue(player, difficulties).await,
            ClientMessage::LeaveQueue => {
                self.handle_leave_queue(&player_id).await;
                Ok(())
            }
            ClientMessage::GetQueueStatus => {
                self.handle_queue_status(&player_id).await;
                Ok(())
            }
            ClientMessage::JoinGame { session_id, .. } => {
                self.handle_join_game(&player_id, session_id).await
            }
            ClientMessage::CodeUpdate {
                session_id,
                code,
                language,
                ..
            } => {
                self.handle_code_update(&player_id, session_id, code, language, None)
                    .await
            }
            ClientMessage::InstantCodeUpdate {
                session_id,
                code,
                language,
                reason,
                ..
            } => {
                self.handle_code_update(
                    &player_id,
                    session_id,
                    code,
                    language,
                    Some(reason),
                )
                .await
            }
            ClientMessage::PlayerStatusUpdate {
                session_id,
                status,
                data,
                ..
            } => {
                self.handle_status_update(&player_id, session_id, status, data)
                    .await
            }
            ClientMessage::SendEmoji {
                session_id, emoji, ..
            } => self.send_reaction(session_id, &player_id, emoji).await,
            ClientMessage::RunSample {
                session_id,
                code,
                language,
                ..
            } => {
                self.handle_run_sample(&player_id, session_id, code, language)
                    .await
            }
            ClientMessage::SubmitSolution {
                session_id,
                code,
                language,
                elapsed_ms,
                ..
            } => {
                self.handle_submit_solution(&player_id, session_id, code, language, elapsed_ms)
                    .await
            }
            ClientMessage::LeaveGame { session_id, .. } => {
                self.handle_leave_game(&player_id, session_id).await
            }
            ClientMessage::Ping => Ok(()),
        };

        if let Err(violation) = result {
            self.report_violation(&player_id, &violation).await;
        }
    }
}

