//! Session actor.
//!
//! Each live session runs on its own task. Handlers reach it through a [`SessionHandle`], which
//! queues commands on a bounded channel; the actor applies them one at a time. Timers (relay
//! cadence, disconnect grace, join timeout) are child tasks that post a generation-tagged command
//! back into the same queue, so a timer never mutates state directly.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::code_sync::{self, RelayDecision, RelayThrottle};
use super::reactions::ReactionLimiter;
use super::store::FinishedOutcomes;
use super::{RatingDelta, Session, SessionError, SessionPolicy, VerdictOutcome};
use crate::clock;
use crate::coordination::MessageCoordinator;
use crate::metrics::ServerMetrics;
use crate::protocol::{
    CancelReason, Difficulty, EndReason, ErrorCode, GameCompletedPayload, InstantReason, PlayerId,
    QuestionRef, ServerMessage, SessionId, SessionState, Verdict,
};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// What a submitter needs to call the judge outside the actor.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub question: QuestionRef,
    pub start_time: Option<DateTime<Utc>>,
}

pub(crate) enum SessionCommand {
    Join {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    Code {
        player_id: PlayerId,
        language: String,
        code: String,
        instant: Option<InstantReason>,
        reply: Reply<()>,
    },
    Status {
        player_id: PlayerId,
        status: String,
        data: Option<serde_json::Value>,
        reply: Reply<()>,
    },
    Reaction {
        sender: PlayerId,
        emoji: String,
        reply: Reply<()>,
    },
    BeginSubmission {
        player_id: PlayerId,
        reply: Reply<SubmissionTicket>,
    },
    Verdict {
        player_id: PlayerId,
        verdict: Verdict,
        reply: Reply<()>,
    },
    Leave {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    Disconnected {
        player_id: PlayerId,
    },
    RelayDue {
        index: usize,
        generation: u64,
    },
    GraceExpired {
        index: usize,
        generation: u64,
    },
    JoinTimeout,
    Shutdown,
}

/// Cheap, cloneable address of a live session.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    difficulty: Difficulty,
    question: QuestionRef,
    participants: [PlayerId; 2],
    commands: mpsc::Sender<SessionCommand>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub(crate) fn new(session: &Session, commands: mpsc::Sender<SessionCommand>) -> Self {
        Self {
            id: session.id,
            difficulty: session.difficulty,
            question: session.question.clone(),
            participants: session.participant_ids(),
            commands,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn question(&self) -> &QuestionRef {
        &self.question
    }

    pub fn participants(&self) -> &[PlayerId; 2] {
        &self.participants
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.participants.iter().any(|id| id == player_id)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn join(&self, player_id: &str) -> Result<(), SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::Join { player_id, reply })
            .await
    }

    pub async fn update_code(
        &self,
        player_id: &str,
        language: String,
        code: String,
        instant: Option<InstantReason>,
    ) -> Result<(), SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::Code {
            player_id,
            language,
            code,
            instant,
            reply,
        })
        .await
    }

    pub async fn relay_status(
        &self,
        player_id: &str,
        status: String,
        data: Option<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::Status {
            player_id,
            status,
            data,
            reply,
        })
        .await
    }

    pub async fn send_reaction(&self, sender: &str, emoji: String) -> Result<(), SessionError> {
        let sender = sender.to_string();
        self.request(|reply| SessionCommand::Reaction {
            sender,
            emoji,
            reply,
        })
        .await
    }

    pub async fn begin_submission(&self, player_id: &str) -> Result<SubmissionTicket, SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::BeginSubmission { player_id, reply })
            .await
    }

    pub async fn record_verdict(&self, player_id: &str, verdict: Verdict) -> Result<(), SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::Verdict {
            player_id,
            verdict,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: &str) -> Result<(), SessionError> {
        let player_id = player_id.to_string();
        self.request(|reply| SessionCommand::Leave { player_id, reply })
            .await
    }

    /// Transport for `player_id` closed. Fire-and-forget.
    pub async fn disconnected(&self, player_id: &str) {
        let command = SessionCommand::Disconnected {
            player_id: player_id.to_string(),
        };
        if self.commands.send(command).await.is_err() {
            debug!(session_id = %self.id, "Disconnect for a session that already ended");
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }
}

/// Shared collaborators every actor needs.
#[derive(Clone)]
pub struct SessionContext {
    pub policy: SessionPolicy,
    pub coordinator: Arc<dyn MessageCoordinator>,
    pub metrics: Arc<ServerMetrics>,
    pub outcomes: Arc<FinishedOutcomes>,
}

pub(crate) struct SessionActor {
    session: Session,
    ctx: SessionContext,
    commands: mpsc::Receiver<SessionCommand>,
    self_tx: mpsc::Sender<SessionCommand>,
    timers: JoinSet<()>,
    relays: [RelayThrottle; 2],
    grace: [Option<u64>; 2],
    grace_generation: u64,
    reactions: ReactionLimiter,
}

impl SessionActor {
    pub(crate) fn new(
        session: Session,
        ctx: SessionContext,
        commands: mpsc::Receiver<SessionCommand>,
        self_tx: mpsc::Sender<SessionCommand>,
    ) -> Self {
        let reactions = ReactionLimiter::new(ctx.policy.reaction_cooldown);
        Self {
            session,
            ctx,
            commands,
            self_tx,
            timers: JoinSet::new(),
            relays: Default::default(),
            grace: [None; 2],
            grace_generation: 0,
            reactions,
        }
    }

    /// Process commands until the session reaches FINISHED. Pending timers are aborted on return.
    pub(crate) async fn run(mut self) -> Option<Arc<GameCompletedPayload>> {
        self.arm(SessionCommand::JoinTimeout, self.ctx.policy.join_timeout);
        info!(
            difficulty = self.session.difficulty.as_str(),
            question = %self.session.question.slug,
            "Session created"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command).await;
                    if self.session.state() == SessionState::Finished {
                        break;
                    }
                }
                Some(_) = self.timers.join_next(), if !self.timers.is_empty() => {}
            }
        }

        self.session.outcome().cloned()
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Join { player_id, reply } => {
                let _ = reply.send(self.join(&player_id).await);
            }
            SessionCommand::Code {
                player_id,
                language,
                code,
                instant,
                reply,
            } => {
                let result = self.update_code(&player_id, language, code, instant).await;
                let _ = reply.send(result);
            }
            SessionCommand::Status {
                player_id,
                status,
                data,
                reply,
            } => {
                let _ = reply.send(self.relay_status(&player_id, status, data).await);
            }
            SessionCommand::Reaction {
                sender,
                emoji,
                reply,
            } => {
                let _ = reply.send(self.reaction(&sender, emoji).await);
            }
            SessionCommand::BeginSubmission { player_id, reply } => {
                let result = self
                    .session
                    .ensure_running(&player_id)
                    .map(|_| SubmissionTicket {
                        question: self.session.question.clone(),
                        start_time: self.session.start_time(),
                    });
                let _ = reply.send(result);
            }
            SessionCommand::Verdict {
                player_id,
                verdict,
                reply,
            } => {
                let _ = reply.send(self.record_verdict(&player_id, verdict).await);
            }
            SessionCommand::Leave { player_id, reply } => {
                let _ = reply.send(self.leave(&player_id).await);
            }
            SessionCommand::Disconnected { player_id } => self.disconnected(&player_id).await,
            SessionCommand::RelayDue { index, generation } => {
                if self.relays[index & 1].fire(generation)
                    && self.session.state() != SessionState::Finished
                {
                    self.relay(index, None, Utc::now()).await;
                    self.ctx.metrics.increment_relays_throttled();
                }
            }
            SessionCommand::GraceExpired { index, generation } => {
                self.grace_expired(index & 1, generation).await;
            }
            SessionCommand::JoinTimeout => self.join_timeout().await,
            SessionCommand::Shutdown => self.shutdown().await,
        }
    }

    async fn join(&mut self, player_id: &str) -> Result<(), SessionError> {
        let now = Utc::now();
        let outcome = self.session.join(player_id, now)?;
        let index = outcome.index;

        if outcome.reconnected && self.grace[index].take().is_some() {
            info!(%player_id, "Participant reconnected within grace period");
            let opponent = self.session.opponent(index).id().clone();
            self.send(
                &opponent,
                ServerMessage::OpponentReconnected {
                    player_id: player_id.to_string(),
                },
            )
            .await;
        }

        let payload = self.session.joined_payload(index, now);
        self.send(player_id, ServerMessage::GameJoined(Box::new(payload)))
            .await;

        if outcome.started {
            if let Some(start_time) = self.session.start_time() {
                self.ctx.metrics.increment_sessions_started();
                info!(start_time = %start_time, "Both participants joined; match running");
                self.broadcast(ServerMessage::GameStart {
                    session_id: self.session.id,
                    start_time,
                })
                .await;
            }
            // the earlier joiner may have dropped while the match was pending
            let opponent = self.session.opponent(index);
            if !opponent.connected {
                let opponent_id = opponent.id().clone();
                self.disconnected(&opponent_id).await;
            }
        }
        Ok(())
    }

    async fn update_code(
        &mut self,
        player_id: &str,
        language: String,
        code: String,
        instant: Option<InstantReason>,
    ) -> Result<(), SessionError> {
        let now = Utc::now();
        let write = self.session.update_code(player_id, &language, code, now)?;
        self.ctx.metrics.increment_code_updates();

        let index = write.index;
        let opponent = self.session.opponent(index).id().clone();
        let decision = code_sync::decide(
            instant,
            self.session.start_time(),
            now,
            self.ctx.policy.instant_window,
        );
        let is_instant = matches!(decision, RelayDecision::Instant(_));

        self.send(
            &opponent,
            ServerMessage::PlayerCodeUpdated {
                player_id: player_id.to_string(),
                timestamp: now,
                instant: is_instant,
            },
        )
        .await;
        if write.language_changed {
            self.send(
                &opponent,
                ServerMessage::PlayerLanguageChanged {
                    player_id: player_id.to_string(),
                    language,
                    immediate: is_instant,
                },
            )
            .await;
        }

        match decision {
            RelayDecision::Instant(reason) => {
                if self.relays[index].cancel() {
                    self.ctx.metrics.increment_relays_superseded();
                }
                self.relay(index, Some(reason), now).await;
                self.ctx.metrics.increment_relays_instant();
            }
            RelayDecision::Throttled { downgraded } => {
                if downgraded {
                    self.ctx.metrics.increment_instant_downgraded();
                    debug!(%player_id, "Language switch outside instant window; throttling");
                }
                if let Some(generation) = self.relays[index].schedule() {
                    self.arm(
                        SessionCommand::RelayDue { index, generation },
                        self.ctx.policy.relay_cadence,
                    );
                }
            }
        }
        Ok(())
    }

    /// Send the participant's latest code, read at send time, to the opponent.
    async fn relay(&self, index: usize, reason: Option<InstantReason>, now: DateTime<Utc>) {
        let participant = self.session.participant(index);
        let Some((language, code)) = participant.current_code() else {
            return;
        };
        let message = ServerMessage::OpponentCodeReady {
            code: code.to_string(),
            from: participant.id().clone(),
            language: language.to_string(),
            timestamp: participant.updated_at.get(language).copied().unwrap_or(now),
            instant: reason.is_some(),
            reason,
        };
        let opponent = self.session.opponent(index).id().clone();
        self.send(&opponent, message).await;
    }

    async fn relay_status(
        &self,
        player_id: &str,
        status: String,
        data: Option<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let index = self.session.index_of(player_id)?;
        if self.session.state() == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        let opponent = self.session.opponent(index).id().clone();
        self.send(
            &opponent,
            ServerMessage::PlayerStatusChanged {
                player_id: player_id.to_string(),
                status,
                data,
            },
        )
        .await;
        Ok(())
    }

    async fn reaction(&mut self, sender: &str, emoji: String) -> Result<(), SessionError> {
        let index = self.session.index_of(sender)?;
        if self.session.state() == SessionState::Finished {
            return Err(SessionError::Finished);
        }
        if !self
            .reactions
            .try_accept(sender, tokio::time::Instant::now())
        {
            self.ctx.metrics.increment_reactions_dropped();
            return Err(SessionError::ReactionCooldown);
        }
        self.ctx.metrics.increment_reactions_accepted();

        let opponent = self.session.opponent(index).id().clone();
        self.send(
            &opponent,
            ServerMessage::EmojiReceived {
                emoji,
                from: sender.to_string(),
                sent_at: Utc::now(),
                display_ms: self.ctx.policy.reaction_display_ms,
                fade_after_ms: self.ctx.policy.reaction_fade_after_ms,
            },
        )
        .await;
        Ok(())
    }

    async fn record_verdict(&mut self, player_id: &str, verdict: Verdict) -> Result<(), SessionError> {
        let index = self.session.index_of(player_id)?;
        self.send(
            player_id,
            ServerMessage::SubmissionResult {
                session_id: self.session.id,
                verdict: verdict.clone(),
            },
        )
        .await;

        let delta = self.rating_delta();
        match self
            .session
            .record_verdict(player_id, verdict.clone(), Utc::now(), delta)?
        {
            VerdictOutcome::Won(payload) => {
                self.ctx.metrics.increment_sessions_completed();
                info!(winner = %payload.winner_id, "Match won by first successful submission");
                self.finish(payload).await;
            }
            VerdictOutcome::Recorded { .. } => {
                let opponent = self.session.opponent(index).id().clone();
                self.send(
                    &opponent,
                    ServerMessage::OpponentSubmitted {
                        player_id: player_id.to_string(),
                        verdict,
                    },
                )
                .await;
            }
        }
        Ok(())
    }

    async fn leave(&mut self, player_id: &str) -> Result<(), SessionError> {
        self.session.index_of(player_id)?;
        match self.session.state() {
            SessionState::Running => {
                let delta = self.rating_delta();
                let payload =
                    self.session
                        .forfeit(player_id, EndReason::Abandoned, Utc::now(), delta)?;
                self.ctx.metrics.increment_sessions_abandoned();
                info!(%player_id, "Participant abandoned the match");
                self.finish(payload).await;
                Ok(())
            }
            SessionState::PendingJoin => {
                self.session.cancel()?;
                self.ctx.metrics.increment_sessions_cancelled();
                info!(%player_id, "Participant left before the match started");
                self.broadcast(ServerMessage::MatchCancelled {
                    session_id: self.session.id,
                    reason: CancelReason::Abandoned,
                })
                .await;
                Ok(())
            }
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    async fn disconnected(&mut self, player_id: &str) {
        let Ok(index) = self.session.mark_disconnected(player_id) else {
            return;
        };
        if self.session.state() != SessionState::Running {
            return;
        }

        self.grace_generation += 1;
        let generation = self.grace_generation;
        self.grace[index] = Some(generation);
        let grace = self.ctx.policy.disconnect_grace;
        let grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        info!(%player_id, grace_ms, "Participant disconnected; grace period started");

        let opponent = self.session.opponent(index).id().clone();
        self.send(
            &opponent,
            ServerMessage::OpponentDisconnected {
                player_id: player_id.to_string(),
                grace_ms,
            },
        )
        .await;
        self.arm(SessionCommand::GraceExpired { index, generation }, grace);
    }

    async fn grace_expired(&mut self, index: usize, generation: u64) {
        if self.grace[index] != Some(generation)
            || self.session.participant(index).connected
            || self.session.state() != SessionState::Running
        {
            return;
        }
        self.grace[index] = None;

        let now = Utc::now();
        let elapsed = self
            .session
            .start_time()
            .map_or(Duration::ZERO, |start| clock::elapsed(now, start));
        let rated = elapsed >= self.ctx.policy.rated_forfeit_min_elapsed
            || !self.session.finished().is_empty();
        let delta = if rated {
            self.rating_delta()
        } else {
            RatingDelta::default()
        };

        let loser = self.session.participant(index).id().clone();
        match self
            .session
            .forfeit(&loser, EndReason::Disconnection, now, delta)
        {
            Ok(payload) => {
                self.ctx.metrics.increment_sessions_forfeited();
                info!(%loser, rated, "Grace period expired; match forfeited");
                self.finish(payload).await;
            }
            Err(err) => warn!(%loser, %err, "Forfeit rejected"),
        }
    }

    async fn join_timeout(&mut self) {
        if self.session.state() != SessionState::PendingJoin {
            return;
        }
        if self.session.cancel().is_err() {
            return;
        }
        self.ctx.metrics.increment_sessions_expired();
        info!("Participants did not join in time; session discarded");
        self.broadcast(ServerMessage::MatchCancelled {
            session_id: self.session.id,
            reason: CancelReason::JoinTimeout,
        })
        .await;
        self.broadcast(ServerMessage::error(
            ErrorCode::JoinTimeout,
            "The match was cancelled because both players did not join in time.",
        ))
        .await;
    }

    async fn shutdown(&mut self) {
        match self.session.state() {
            SessionState::Finished => return,
            SessionState::PendingJoin => {
                self.broadcast(ServerMessage::MatchCancelled {
                    session_id: self.session.id,
                    reason: CancelReason::ServerShutdown,
                })
                .await;
            }
            SessionState::Running => {}
        }
        self.session.close();
        self.ctx.metrics.increment_sessions_cancelled();
        self.broadcast(ServerMessage::error(
            ErrorCode::ServiceUnavailable,
            "The server is shutting down.",
        ))
        .await;
    }

    /// Record the outcome before announcing it, so a rejoin never misses it.
    async fn finish(&self, payload: Arc<GameCompletedPayload>) {
        self.ctx
            .outcomes
            .record(self.session.id, Arc::clone(&payload))
            .await;
        self.broadcast(ServerMessage::GameCompleted(Box::new((*payload).clone())))
            .await;
    }

    fn rating_delta(&self) -> RatingDelta {
        RatingDelta {
            gain: self.ctx.policy.rating_gain,
            loss: self.ctx.policy.rating_loss,
        }
    }

    fn arm(&mut self, command: SessionCommand, after: Duration) {
        let tx = self.self_tx.clone();
        self.timers.spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(command).await;
        });
    }

    async fn send(&self, player_id: &str, message: ServerMessage) {
        if let Err(err) = self
            .ctx
            .coordinator
            .send_to_player(player_id, Arc::new(message))
            .await
        {
            warn!(%player_id, %err, "Failed to deliver session event");
        }
    }

    async fn broadcast(&self, message: ServerMessage) {
        let players = self.session.participant_ids();
        if let Err(err) = self
            .ctx
            .coordinator
            .send_to_players(&players, Arc::new(message))
            .await
        {
            warn!(%err, "Failed to broadcast session event");
        }
    }
}
