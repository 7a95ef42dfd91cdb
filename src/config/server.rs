//! Server lifecycle configuration types.

use super::defaults::{
    default_disconnect_grace_secs, default_drain_timeout_secs, default_finished_session_retention,
    default_join_timeout_secs, default_maintenance_interval_secs,
    default_session_command_capacity,
};
use serde::{Deserialize, Serialize};

/// Server configuration for session lifecycle and maintenance.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Time a matched session may stay in PENDING_JOIN before it is discarded (seconds)
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
    /// Grace period after a participant's transport drops before the opponent wins by forfeit (seconds)
    #[serde(default = "default_disconnect_grace_secs")]
    pub disconnect_grace_secs: u64,
    /// Interval for the maintenance task (seconds)
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Number of finished session outcomes kept for late room-joins
    #[serde(default = "default_finished_session_retention")]
    pub finished_session_retention: usize,
    /// Time allowed for graceful shutdown before connections are dropped (seconds)
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// Bounded command queue per session actor
    #[serde(default = "default_session_command_capacity")]
    pub session_command_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: default_join_timeout_secs(),
            disconnect_grace_secs: default_disconnect_grace_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            finished_session_retention: default_finished_session_retention(),
            drain_timeout_secs: default_drain_timeout_secs(),
            session_command_capacity: default_session_command_capacity(),
        }
    }
}
