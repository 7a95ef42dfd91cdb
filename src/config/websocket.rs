//! WebSocket configuration types.

use super::defaults::{
    default_idle_timeout_secs, default_outbound_queue_capacity, default_ping_interval_secs,
};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Per-connection outbound queue; messages beyond it are dropped and counted
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Close connections that send nothing (not even pongs) for this long (seconds)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Server-sent ping cadence; a live client's pong keeps the connection open (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outbound_queue_capacity == 0 {
            anyhow::bail!("websocket.outbound_queue_capacity must be at least 1");
        }
        if self.idle_timeout_secs < 10 {
            anyhow::bail!(
                "websocket.idle_timeout_secs must be at least 10 seconds (configured: {})",
                self.idle_timeout_secs
            );
        }
        if self.ping_interval_secs == 0 || self.ping_interval_secs >= self.idle_timeout_secs {
            anyhow::bail!(
                "websocket.ping_interval_secs must be between 1 and idle_timeout_secs - 1 (configured: {})",
                self.ping_interval_secs
            );
        }
        Ok(())
    }
}
