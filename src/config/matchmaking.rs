//! Matchmaking configuration types.

use super::defaults::{default_difficulty_priority, default_sweep_interval_ms};
use crate::protocol::Difficulty;
use serde::{Deserialize, Serialize};

/// Matchmaking queue configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchmakingConfig {
    /// Interval of the periodic pairing sweep (milliseconds)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Tie-break order when two waiters share several difficulties; first wins
    #[serde(default = "default_difficulty_priority")]
    pub difficulty_priority: Vec<Difficulty>,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            difficulty_priority: default_difficulty_priority(),
        }
    }
}
