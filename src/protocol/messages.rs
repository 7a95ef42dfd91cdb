use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error_codes::ErrorCode;
use super::types::{
    CancelReason, ConnectionId, Difficulty, EndReason, InstantReason, PlayerId, PlayerProfile,
    PlayerSummary, QuestionRef, SessionId, Verdict,
};

/// Message types sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter matchmaking. Binds this connection to `player.id`.
    JoinQueue {
        player: PlayerProfile,
        difficulties: Vec<Difficulty>,
    },
    /// Leave matchmaking before a match is found
    LeaveQueue,
    GetQueueStatus,
    /// Room-join for a matched session. Binds this connection to `player_id`.
    JoinGame {
        session_id: SessionId,
        player_id: PlayerId,
    },
    /// Keystroke-rate code update, relayed to the opponent at a throttled cadence
    CodeUpdate {
        session_id: SessionId,
        player_id: PlayerId,
        code: String,
        language: String,
    },
    /// Code update delivered to the opponent immediately
    InstantCodeUpdate {
        session_id: SessionId,
        player_id: PlayerId,
        code: String,
        language: String,
        #[serde(default)]
        reason: InstantReason,
    },
    PlayerStatusUpdate {
        session_id: SessionId,
        player_id: PlayerId,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "send-emoji")]
    SendEmoji {
        session_id: SessionId,
        emoji: String,
        sender: PlayerId,
    },
    /// Run the sample tests only; never affects the session
    RunSample {
        session_id: SessionId,
        player_id: PlayerId,
        code: String,
        language: String,
    },
    /// Run the full test suite; the verdict feeds the submission coordinator
    SubmitSolution {
        session_id: SessionId,
        player_id: PlayerId,
        code: String,
        language: String,
        /// Client-side elapsed time; advisory only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elapsed_ms: Option<u64>,
    },
    /// Abandon the match
    LeaveGame {
        session_id: SessionId,
        player_id: PlayerId,
    },
    Ping,
}

impl ClientMessage {
    /// Identity asserted by this message, if it carries one.
    pub fn asserted_identity(&self) -> Option<&str> {
        match self {
            Self::JoinQueue { player, .. } => Some(&player.id),
            Self::JoinGame { player_id, .. }
            | Self::CodeUpdate { player_id, .. }
            | Self::InstantCodeUpdate { player_id, .. }
            | Self::PlayerStatusUpdate { player_id, .. }
            | Self::RunSample { player_id, .. }
            | Self::SubmitSolution { player_id, .. }
            | Self::LeaveGame { player_id, .. } => Some(player_id),
            Self::SendEmoji { sender, .. } => Some(sender),
            Self::LeaveQueue | Self::GetQueueStatus | Self::Ping => None,
        }
    }

    /// Whether this message may establish the connection's identity binding.
    pub fn binds_identity(&self) -> bool {
        matches!(self, Self::JoinQueue { .. } | Self::JoinGame { .. })
    }
}

/// Payload for the MatchFound server message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFoundPayload {
    pub session_id: SessionId,
    pub opponent: PlayerSummary,
    pub question: QuestionRef,
    pub difficulty: Difficulty,
}

/// Payload for the GameJoined server message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameJoinedPayload {
    pub session_id: SessionId,
    /// Present only when the session is already running.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub server_time: DateTime<Utc>,
    pub question: QuestionRef,
    pub opponent: PlayerSummary,
    /// The joining player's own stored code, keyed by language.
    #[serde(default)]
    pub your_code: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_language: Option<String>,
    /// Catalog starter code, keyed by language.
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
}

/// Payload for the GameCompleted server message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameCompletedPayload {
    pub session_id: SessionId,
    pub message: String,
    pub winner_id: PlayerId,
    pub winner_name: String,
    pub loser_id: PlayerId,
    pub loser_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_verdict: Option<Verdict>,
    /// Absent when the loser never submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loser_verdict: Option<Verdict>,
    pub end_reason: EndReason,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ended_at: DateTime<Utc>,
    pub rating_gain: i64,
    pub rating_loss: i64,
}

/// Message types sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        connection_id: ConnectionId,
    },
    QueueJoined {
        difficulties: Vec<Difficulty>,
        queue_size: usize,
    },
    QueueLeft {
        removed: bool,
    },
    QueueStatus {
        in_queue: bool,
        queue_size: usize,
    },
    MatchFound(Box<MatchFoundPayload>),
    GameJoined(Box<GameJoinedPayload>),
    /// Sent to both players when the session transitions to running
    GameStart {
        session_id: SessionId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        start_time: DateTime<Utc>,
    },
    /// Relay output of the code synchronization channel
    OpponentCodeReady {
        code: String,
        from: PlayerId,
        language: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        instant: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<InstantReason>,
    },
    /// Content-free notice that the opponent edited their code
    PlayerCodeUpdated {
        player_id: PlayerId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        instant: bool,
    },
    PlayerLanguageChanged {
        player_id: PlayerId,
        language: String,
        immediate: bool,
    },
    PlayerStatusChanged {
        player_id: PlayerId,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    EmojiReceived {
        emoji: String,
        from: PlayerId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        sent_at: DateTime<Utc>,
        display_ms: u64,
        fade_after_ms: u64,
    },
    SampleResult {
        session_id: SessionId,
        verdict: Verdict,
    },
    /// The submitter's own verdict; always delivered, including judge failures
    SubmissionResult {
        session_id: SessionId,
        verdict: Verdict,
    },
    OpponentSubmitted {
        player_id: PlayerId,
        verdict: Verdict,
    },
    GameCompleted(Box<GameCompletedPayload>),
    OpponentDisconnected {
        player_id: PlayerId,
        grace_ms: u64,
    },
    OpponentReconnected {
        player_id: PlayerId,
    },
    MatchCancelled {
        session_id: SessionId,
        reason: CancelReason,
    },
    ConnectionDisplaced {
        message: String,
        reason: String,
    },
    RemoveDuplicate,
    Pong,
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            error_code: Some(code),
        }
    }

    /// Wire name of this event, for logs and metrics labels.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::QueueJoined { .. } => "queue_joined",
            Self::QueueLeft { .. } => "queue_left",
            Self::QueueStatus { .. } => "queue_status",
            Self::MatchFound(_) => "match_found",
            Self::GameJoined(_) => "game_joined",
            Self::GameStart { .. } => "game_start",
            Self::OpponentCodeReady { .. } => "opponent_code_ready",
            Self::PlayerCodeUpdated { .. } => "player_code_updated",
            Self::PlayerLanguageChanged { .. } => "player_language_changed",
            Self::PlayerStatusChanged { .. } => "player_status_changed",
            Self::EmojiReceived { .. } => "emoji_received",
            Self::SampleResult { .. } => "sample_result",
            Self::SubmissionResult { .. } => "submission_result",
            Self::OpponentSubmitted { .. } => "opponent_submitted",
            Self::GameCompleted(_) => "game_completed",
            Self::OpponentDisconnected { .. } => "opponent_disconnected",
            Self::OpponentReconnected { .. } => "opponent_reconnected",
            Self::MatchCancelled { .. } => "match_cancelled",
            Self::ConnectionDisplaced { .. } => "connection_displaced",
            Self::RemoveDuplicate => "remove_duplicate",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}
