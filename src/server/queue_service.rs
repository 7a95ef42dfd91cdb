use chrono::Utc;
use std::sync::Arc;

use super::{DuelServer, ProtocolViolation};
use crate::matchmaking::Pairing;
use crate::protocol::{
    validation, Difficulty, ErrorCode, MatchFoundPayload, PlayerProfile, QuestionRef,
    ServerMessage,
};
use crate::session::Session;

impl DuelServer {
    pub(crate) async fn handle_join_queue(
        &self,
        player: PlayerProfile,
        difficulties: Vec<Difficulty>,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_profile_with_config(&player, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let difficulties = validation::normalize_difficulties(&difficulties)
            .map_err(ProtocolViolation::InvalidInput)?;
        let player_id = player.id.clone();
        let outcome = self
            .queue
            .enqueue(player, difficulties.clone(), Utc::now(), |player_id| {
                self.sessions.session_of(player_id).is_some()
            })
            .map_err(|refused| {
                tracing::debug!(%player_id, %refused, "Queue join refused");
                ProtocolViolation::AlreadyInSession
            })?;
        self.metrics.increment_queue_joins();
        self.metrics.set_queue_size(outcome.queue_size);
        tracing::info!(
            %player_id,
            ?difficulties,
            replaced = outcome.replaced,
            queue_size = outcome.queue_size,
            "Player joined matchmaking"
        );

        self.send_to_player(
            &player_id,
            ServerMessage::QueueJoined {
                difficulties,
                queue_size: outcome.queue_size,
            },
        )
        .await;

        self.run_matchmaking().await;
        Ok(())
    }

    pub(crate) async fn handle_leave_queue(&self, player_id: &str) {
        let removed = self.queue.dequeue(player_id).is_some();
        if removed {
            self.metrics.increment_queue_leaves();
            self.metrics.set_queue_size(self.queue.len());
            tracing::info!(%player_id, "Player left matchmaking");
        }
        self.send_to_player(player_id, ServerMessage::QueueLeft { removed })
            .await;
    }

    pub(crate) async fn handle_queue_status(&self, player_id: &str) {
        let message = ServerMessage::QueueStatus {
            in_queue: self.queue.contains(player_id),
            queue_size: self.queue.len(),
        };
        self.send_to_player(player_id, message).await;
    }

    /// Pair every compatible couple of connected waiters and start their matches.
    pub async fn run_matchmaking(&self) -> usize {
        let registry = Arc::clone(&self.registry);
        let pairings = self
            .queue
            .take_pairs(&self.config.matchmaking.difficulty_priority, |player_id| {
                registry.is_connected(player_id)
            });
        if pairings.is_empty() {
            return 0;
        }
        self.metrics.set_queue_size(self.queue.len());

        let mut started = 0;
        for pairing in pairings {
            if self.start_match(pairing).await {
                started += 1;
            }
        }
        started
    }

    async fn start_match(&self, pairing: Pairing) -> bool {
        let Pairing {
            first,
            second,
            candidates,
        } = pairing;
        let players = [first.profile, second.profile];
        let reserved = [players[0].id.clone(), players[1].id.clone()];

        let Some((difficulty, question)) = self.draw_question(&candidates).await else {
            self.queue.release(&reserved);
            self.metrics.increment_matches_without_question();
            tracing::warn!(
                first = %players[0].id,
                second = %players[1].id,
                ?candidates,
                "No question available for paired players"
            );
            for player in &players {
                self.send_error_to_player(
                    &player.id,
                    ErrorCode::NoQuestionAvailable,
                    "No question is available for the selected difficulties.",
                )
                .await;
            }
            return false;
        };

        let starter_code = match self.catalog.all_starter_code(&question).await {
            Ok(starters) => starters,
            Err(err) => {
                tracing::warn!(question = %question.slug, %err, "Starter code lookup failed");
                Default::default()
            }
        };

        let session = Session::new(
            uuid::Uuid::new_v4(),
            difficulty,
            question.clone(),
            starter_code,
            players.clone(),
            Utc::now(),
        );
        let session_id = session.id;
        self.sessions.spawn(session, self.session_ctx.clone());
        self.queue.release(&reserved);
        self.metrics.increment_matches_created();
        self.metrics.set_live_sessions(self.sessions.live_count());
        tracing::info!(
            %session_id,
            first = %players[0].id,
            second = %players[1].id,
            difficulty = difficulty.as_str(),
            "Match created"
        );

        for (index, player) in players.iter().enumerate() {
            let opponent = &players[index ^ 1];
            let payload = MatchFoundPayload {
                session_id,
                opponent: opponent.summary(),
                question: question.clone(),
                difficulty,
            };
            self.send_to_player(&player.id, ServerMessage::MatchFound(Box::new(payload)))
                .await;
        }
        true
    }

    /// First difficulty in priority order for which the catalog has a question.
    async fn draw_question(&self, candidates: &[Difficulty]) -> Option<(Difficulty, QuestionRef)> {
        for difficulty in candidates {
            match self.catalog.pick_question(*difficulty).await {
                Ok(question) => return Some((*difficulty, question)),
                Err(err) => {
                    tracing::debug!(difficulty = difficulty.as_str(), %err, "Trying next difficulty");
                }
            }
        }
        None
    }
}
