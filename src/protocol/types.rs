use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque player identity issued by the external identity collaborator.
pub type PlayerId = String;
/// Unique identifier for duel sessions
pub type SessionId = Uuid;
/// Unique identifier for a single transport connection
pub type ConnectionId = Uuid;

/// Problem difficulty a player is willing to accept.
///
/// The derived ordering is the default matchmaking priority: easy before medium before hard.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only copy of a player's identity, as asserted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    /// Per-difficulty rating, display only.
    #[serde(default)]
    pub ratings: BTreeMap<Difficulty, i64>,
}

impl PlayerProfile {
    /// Minimal profile for an identity that never sent one (e.g. joined a room directly).
    pub fn anonymous(id: impl Into<PlayerId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            avatar_url: None,
            anonymous: true,
            ratings: BTreeMap::new(),
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            anonymous: self.anonymous,
        }
    }
}

/// Public view of an opponent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

/// Reference to a catalog question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRef {
    pub slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    /// Languages the question can be solved in; code maps only accept these keys.
    pub languages: Vec<String>,
}

impl QuestionRef {
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.iter().any(|supported| supported == language)
    }
}

/// Judge result for one submission, stamped with the server-derived elapsed time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    pub total_passed: u32,
    pub total_failed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    pub elapsed_ms: u64,
    /// Display score: elapsed seconds minus the complexity reduction.
    pub score: u64,
    /// Failure detail shown to the submitter (compile error, judge outage, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why an instant relay was requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstantReason {
    /// The match clock just started and the editor shows starter code.
    TimerStarted,
    /// The player switched language early in the match.
    LanguageSwitched,
    #[default]
    #[serde(other)]
    Unspecified,
}

/// How a session reached `FINISHED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Solved,
    Disconnection,
    Abandoned,
}

/// Why a session was discarded before it started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    JoinTimeout,
    Abandoned,
    ServerShutdown,
}

/// Room-join state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    PendingJoin,
    Running,
    Finished,
}
