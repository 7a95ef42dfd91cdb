use super::{DuelServer, ProtocolViolation};
use crate::protocol::{validation, InstantReason, ServerMessage, SessionId};
use crate::session::{SessionError, SessionHandle};

impl DuelServer {
    /// Live session `session_id`, provided `player_id` plays in it.
    pub(crate) fn participant_session(
        &self,
        player_id: &str,
        session_id: SessionId,
    ) -> Result<SessionHandle, ProtocolViolation> {
        let handle = self
            .sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound)?;
        if !handle.is_participant(player_id) {
            return Err(SessionError::NotAParticipant.into());
        }
        Ok(handle)
    }

    /// Room-join. A finished session re-delivers its outcome instead of failing.
    pub(crate) async fn handle_join_game(
        &self,
        player_id: &str,
        session_id: SessionId,
    ) -> Result<(), ProtocolViolation> {
        if let Some(handle) = self.sessions.get(&session_id) {
            match handle.join(player_id).await {
                Ok(()) => return Ok(()),
                Err(SessionError::Closed | SessionError::Finished) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let outcome = self
            .sessions
            .finished_outcome(&session_id)
            .await
            .ok_or(SessionError::NotFound)?;
        if outcome.winner_id != player_id && outcome.loser_id != player_id {
            return Err(SessionError::NotAParticipant.into());
        }
        self.send_to_player(player_id, ServerMessage::GameCompleted(Box::new((*outcome).clone())))
            .await;
        Ok(())
    }

    pub(crate) async fn handle_code_update(
        &self,
        player_id: &str,
        session_id: SessionId,
        code: String,
        language: String,
        instant: Option<InstantReason>,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_code_with_config(&code, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let handle = self.participant_session(player_id, session_id)?;
        handle
            .update_code(player_id, language, code, instant)
            .await?;
        Ok(())
    }

    pub(crate) async fn handle_status_update(
        &self,
        player_id: &str,
        session_id: SessionId,
        status: String,
        data: Option<serde_json::Value>,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_status_with_config(&status, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let handle = self.participant_session(player_id, session_id)?;
        handle.relay_status(player_id, status, data).await?;
        Ok(())
    }

    /// Relay a reaction to the sender's opponent. Shared by the transport and the HTTP endpoint.
    pub async fn send_reaction(
        &self,
        session_id: SessionId,
        sender: &str,
        emoji: String,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_emoji_with_config(&emoji, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let handle = self.participant_session(sender, session_id)?;
        handle.send_reaction(sender, emoji).await?;
        Ok(())
    }

    pub(crate) async fn handle_leave_game(
        &self,
        player_id: &str,
        session_id: SessionId,
    ) -> Result<(), ProtocolViolation> {
        let handle = self.participant_session(player_id, session_id)?;
        handle.leave(player_id).await?;
        Ok(())
    }
}
