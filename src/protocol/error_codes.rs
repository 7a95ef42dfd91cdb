use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidInput,
    MessageTooLarge,

    // Identity errors
    IdentityMismatch,
    NotIdentified,

    // Queue and session errors
    AlreadyInSession,
    SessionNotFound,
    NotAParticipant,
    InvalidSessionState,
    UnsupportedLanguage,
    NoQuestionAvailable,
    JoinTimeout,

    // Reaction errors
    ReactionCooldown,

    // Collaborator errors
    JudgeUnavailable,

    // Server errors
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => {
                "The provided input is invalid or malformed. Check your request parameters."
            }
            Self::MessageTooLarge => {
                "The message exceeds the maximum allowed size. Send less data per message."
            }
            Self::IdentityMismatch => {
                "This connection is bound to a different player identity than the one in the request."
            }
            Self::NotIdentified => {
                "This connection has not declared a player identity yet. Join the queue or a game first."
            }
            Self::AlreadyInSession => {
                "You are already playing a match. Finish or leave it before queueing again."
            }
            Self::SessionNotFound => {
                "The requested game does not exist or has already been cleaned up."
            }
            Self::NotAParticipant => "You are not one of the two players in this game.",
            Self::InvalidSessionState => {
                "This action is not allowed in the game's current state."
            }
            Self::UnsupportedLanguage => "The question does not support this language.",
            Self::NoQuestionAvailable => {
                "No question is available for the matched difficulty. Please queue again later."
            }
            Self::JoinTimeout => {
                "The match was cancelled because both players did not join in time."
            }
            Self::ReactionCooldown => "Reactions are rate limited. Wait a moment and try again.",
            Self::JudgeUnavailable => {
                "The code execution service is unavailable. Your submission could not be judged."
            }
            Self::InternalError => {
                "An internal server error occurred. Please try again later."
            }
            Self::ServiceUnavailable => {
                "The server is shutting down or temporarily unavailable. Please reconnect shortly."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
