//! Duel sessions.
//!
//! A [`Session`] is the authoritative state of one match. It is a plain state machine with no
//! I/O; the [`actor`] module owns each session on a dedicated task and is the only writer, so
//! every mutation for one match is applied in arrival order.

pub mod actor;
pub mod code_sync;
pub mod reactions;
pub mod store;
pub mod submission;


use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::protocol::{
    Difficulty, EndReason, ErrorCode, GameCompletedPayload, GameJoinedPayload, PlayerId,
    PlayerProfile, QuestionRef, SessionId, SessionState, Verdict,
};

pub use actor::SessionHandle;
pub use store::SessionStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("you are not a participant of this session")]
    NotAParticipant,
    #[error("the match has not started")]
    NotRunning,
    #[error("the match is already over")]
    Finished,
    #[error("language '{0}' is not supported by this question")]
    UnsupportedLanguage(String),
    #[error("reaction sent too soon after the previous one")]
    ReactionCooldown,
    #[error("session is no longer accepting commands")]
    Closed,
}

impl SessionError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound | Self::Closed => ErrorCode::SessionNotFound,
            Self::NotAParticipant => ErrorCode::NotAParticipant,
            Self::NotRunning | Self::Finished => ErrorCode::InvalidSessionState,
            Self::UnsupportedLanguage(_) => ErrorCode::UnsupportedLanguage,
            Self::ReactionCooldown => ErrorCode::ReactionCooldown,
        }
    }
}

/// Timing and rating knobs shared by every session.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub relay_cadence: Duration,
    pub instant_window: Duration,
    pub reaction_cooldown: Duration,
    pub reaction_display_ms: u64,
    pub reaction_fade_after_ms: u64,
    pub rating_gain: i64,
    pub rating_loss: i64,
    pub rated_forfeit_min_elapsed: Duration,
    pub disconnect_grace: Duration,
    pub join_timeout: Duration,
    pub command_capacity: usize,
}

impl SessionPolicy {
    pub fn from_config(config: &Config) -> Self {
        let duel = &config.duel;
        Self {
            relay_cadence: Duration::from_millis(duel.relay_cadence_ms),
            instant_window: Duration::from_secs(duel.instant_window_secs),
            reaction_cooldown: Duration::from_millis(duel.reaction_cooldown_ms),
            reaction_display_ms: duel.reaction_display_ms,
            reaction_fade_after_ms: duel.reaction_fade_after_ms,
            rating_gain: duel.rating_gain,
            rating_loss: duel.rating_loss,
            rated_forfeit_min_elapsed: Duration::from_secs(duel.rated_forfeit_min_elapsed_secs),
            disconnect_grace: Duration::from_secs(config.server.disconnect_grace_secs),
            join_timeout: Duration::from_secs(config.server.join_timeout_secs),
            command_capacity: config.server.session_command_capacity.max(1),
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Rating change carried by a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingDelta {
    pub gain: i64,
    pub loss: i64,
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub profile: PlayerProfile,
    /// Latest code per language.
    pub code: BTreeMap<String, String>,
    pub current_language: Option<String>,
    pub updated_at: BTreeMap<String, DateTime<Utc>>,
    pub verdict: Option<Verdict>,
    pub joined: bool,
    pub connected: bool,
}

impl Participant {
    fn new(profile: PlayerProfile) -> Self {
        Self {
            profile,
            code: BTreeMap::new(),
            current_language: None,
            updated_at: BTreeMap::new(),
            verdict: None,
            joined: false,
            connected: true,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.profile.id
    }

    /// Code in the currently selected language.
    pub fn current_code(&self) -> Option<(&str, &str)> {
        let language = self.current_language.as_deref()?;
        let code = self.code.get(language)?;
        Some((language, code.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub index: usize,
    /// First room-join by this participant.
    pub first_join: bool,
    /// The participant's transport had dropped and this join brings it back.
    pub reconnected: bool,
    /// This join moved the session to RUNNING.
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeWrite {
    pub index: usize,
    pub language_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictOutcome {
    /// Recorded without ending the match.
    Recorded { index: usize },
    /// First successful submission; the match is over.
    Won(Arc<GameCompletedPayload>),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub difficulty: Difficulty,
    pub question: QuestionRef,
    pub starter_code: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    state: SessionState,
    participants: [Participant; 2],
    finished: Vec<PlayerId>,
    outcome: Option<Arc<GameCompletedPayload>>,
}

impl Session {
    pub fn new(
        id: SessionId,
        difficulty: Difficulty,
        question: QuestionRef,
        starter_code: BTreeMap<String, String>,
        players: [PlayerProfile; 2],
        now: DateTime<Utc>,
    ) -> Self {
        let [a, b] = players;
        Self {
            id,
            difficulty,
            question,
            starter_code,
            created_at: now,
            start_time: None,
            state: SessionState::PendingJoin,
            participants: [Participant::new(a), Participant::new(b)],
            finished: Vec::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn outcome(&self) -> Option<&Arc<GameCompletedPayload>> {
        self.outcome.as_ref()
    }

    pub fn finished(&self) -> &[PlayerId] {
        &self.finished
    }

    pub fn participant_ids(&self) -> [PlayerId; 2] {
        [
            self.participants[0].id().clone(),
            self.participants[1].id().clone(),
        ]
    }

    pub fn participant(&self, index: usize) -> &Participant {
        &self.participants[index & 1]
    }

    pub fn opponent(&self, index: usize) -> &Participant {
        &self.participants[(index & 1) ^ 1]
    }

    pub fn index_of(&self, player_id: &str) -> Result<usize, SessionError> {
        self.participants
            .iter()
            .position(|participant| participant.id() == player_id)
            .ok_or(SessionError::NotAParticipant)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Finished {
            Err(SessionError::Finished)
        } else {
            Ok(())
        }
    }

    /// Room-join. The second distinct join sets `start_time`, exactly once.
    pub fn join(&mut self, player_id: &str, now: DateTime<Utc>) -> Result<JoinOutcome, SessionError> {
        let index = self.index_of(player_id)?;
        self.ensure_open()?;

        let participant = &mut self.participants[index];
        let first_join = !participant.joined;
        let reconnected = !participant.connected;
        participant.joined = true;
        participant.connected = true;

        let started = self.state == SessionState::PendingJoin
            && self.participants.iter().all(|p| p.joined)
            && self.start_time.is_none();
        if started {
            self.start_time = Some(now);
            self.state = SessionState::Running;
        }

        Ok(JoinOutcome {
            index,
            first_join,
            reconnected,
            started,
        })
    }

    pub fn joined_payload(&self, index: usize, now: DateTime<Utc>) -> GameJoinedPayload {
        let me = self.participant(index);
        GameJoinedPayload {
            session_id: self.id,
            start_time: self.start_time,
            server_time: now,
            question: self.question.clone(),
            opponent: self.opponent(index).profile.summary(),
            your_code: me.code.clone(),
            current_language: me.current_language.clone(),
            starter_code: self.starter_code.clone(),
        }
    }

    /// Store the latest code for `(player, language)`. Never rejected for frequency.
    pub fn update_code(
        &mut self,
        player_id: &str,
        language: &str,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<CodeWrite, SessionError> {
        let index = self.index_of(player_id)?;
        self.ensure_open()?;
        if !self.question.supports_language(language) {
            return Err(SessionError::UnsupportedLanguage(language.to_string()));
        }

        let participant = &mut self.participants[index];
        let language_changed = participant.current_language.as_deref() != Some(language);
        participant.code.insert(language.to_string(), code);
        participant.updated_at.insert(language.to_string(), now);
        participant.current_language = Some(language.to_string());

        Ok(CodeWrite {
            index,
            language_changed,
        })
    }

    pub fn mark_disconnected(&mut self, player_id: &str) -> Result<usize, SessionError> {
        let index = self.index_of(player_id)?;
        self.participants[index].connected = false;
        Ok(index)
    }

    /// Submissions are only judged while RUNNING.
    pub fn ensure_running(&self, player_id: &str) -> Result<usize, SessionError> {
        let index = self.index_of(player_id)?;
        match self.state {
            SessionState::Running => Ok(index),
            SessionState::PendingJoin => Err(SessionError::NotRunning),
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    /// Apply a judged verdict. The first successful verdict wins the match.
    pub fn record_verdict(
        &mut self,
        player_id: &str,
        verdict: Verdict,
        now: DateTime<Utc>,
        delta: RatingDelta,
    ) -> Result<VerdictOutcome, SessionError> {
        let index = self.ensure_running(player_id)?;
        let success = verdict.success;
        self.participants[index].verdict = Some(verdict);

        if success && !self.finished.iter().any(|id| id == player_id) {
            self.finished.push(player_id.to_string());
            if self.finished.len() == 1 {
                let payload = self.complete(index, EndReason::Solved, now, delta);
                return Ok(VerdictOutcome::Won(payload));
            }
        }
        Ok(VerdictOutcome::Recorded { index })
    }

    /// End a RUNNING match in the opponent's favour.
    pub fn forfeit(
        &mut self,
        loser_id: &str,
        reason: EndReason,
        now: DateTime<Utc>,
        delta: RatingDelta,
    ) -> Result<Arc<GameCompletedPayload>, SessionError> {
        let loser = self.ensure_running(loser_id)?;
        Ok(self.complete(loser ^ 1, reason, now, delta))
    }

    /// Discard a match that never started.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::PendingJoin => {
                self.state = SessionState::Finished;
                Ok(())
            }
            SessionState::Running => Err(SessionError::NotRunning),
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    /// Force the terminal state without an outcome (server shutdown).
    pub fn close(&mut self) {
        self.state = SessionState::Finished;
    }

    fn complete(
        &mut self,
        winner: usize,
        reason: EndReason,
        now: DateTime<Utc>,
        delta: RatingDelta,
    ) -> Arc<GameCompletedPayload> {
        self.state = SessionState::Finished;
        let winner_p = self.participant(winner);
        let loser_p = self.opponent(winner);
        let message = match reason {
            EndReason::Solved => format!("{} solved it first!", winner_p.profile.name),
            EndReason::Disconnection => format!(
                "{} disconnected. {} wins by forfeit.",
                loser_p.profile.name, winner_p.profile.name
            ),
            EndReason::Abandoned => format!(
                "{} left the match. {} wins.",
                loser_p.profile.name, winner_p.profile.name
            ),
        };
        let payload = Arc::new(GameCompletedPayload {
            session_id: self.id,
            message,
            winner_id: winner_p.id().clone(),
            winner_name: winner_p.profile.name.clone(),
            loser_id: loser_p.id().clone(),
            loser_name: loser_p.profile.name.clone(),
            winner_verdict: winner_p.verdict.clone(),
            loser_verdict: loser_p.verdict.clone(),
            end_reason: reason,
            ended_at: now,
            rating_gain: delta.gain,
            rating_loss: delta.loss,
        });
        self.outcome = Some(Arc::clone(&payload));
        payload
    }
}
