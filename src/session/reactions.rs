//! Reaction rate limiting.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::protocol::PlayerId;

/// At most one reaction per sender per cooldown. Rejected reactions do not reset the window.
#[derive(Debug)]
pub struct ReactionLimiter {
    cooldown: Duration,
    last_accepted: HashMap<PlayerId, Instant>,
}

impl ReactionLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: HashMap::new(),
        }
    }

    pub fn try_accept(&mut self, sender: &str, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(sender) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_accepted.insert(sender.to_string(), now);
        true
    }
}
