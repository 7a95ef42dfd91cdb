//! Code relay throttling.
//!
//! Keystroke-rate updates are stored immediately but relayed to the opponent at most once per
//! cadence. A relay is identified by a generation number; a timer firing with a stale generation
//! is ignored.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::clock;
use crate::protocol::InstantReason;

/// Per-participant relay state.
#[derive(Debug, Default, Clone)]
pub struct RelayThrottle {
    generation: u64,
    pending: Option<u64>,
}

impl RelayThrottle {
    /// Arm a relay. Returns the generation the timer must carry, or `None` when a relay is
    /// already pending and this update coalesces into it.
    pub fn schedule(&mut self) -> Option<u64> {
        if self.pending.is_some() {
            return None;
        }
        self.generation = self.generation.wrapping_add(1);
        self.pending = Some(self.generation);
        Some(self.generation)
    }

    /// Consume the pending relay if `generation` is still current.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.pending == Some(generation) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop the pending relay; returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayDecision {
    Instant(InstantReason),
    /// Goes through the throttle. `downgraded` marks an instant request refused by the window.
    Throttled { downgraded: bool },
}

/// Decide how an update is relayed.
///
/// Language switches are instant only before the match starts or inside `window` of the start.
pub fn decide(
    instant: Option<InstantReason>,
    start_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> RelayDecision {
    match instant {
        None => RelayDecision::Throttled { downgraded: false },
        Some(InstantReason::LanguageSwitched) => {
            let allowed = start_time.is_none_or(|start| clock::within(now, start, window));
            if allowed {
                RelayDecision::Instant(InstantReason::LanguageSwitched)
            } else {
                RelayDecision::Throttled { downgraded: true }
            }
        }
        Some(reason) => RelayDecision::Instant(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn updates_coalesce_while_a_relay_is_pending() {
        let mut throttle = RelayThrottle::default();
        let generation = throttle.schedule().unwrap();
        assert_eq!(throttle.schedule(), None);
        assert_eq!(throttle.schedule(), None);
        assert!(throttle.fire(generation));
        assert!(!throttle.is_pending());
    }

    #[test]
    fn cancelled_relay_ignores_its_timer() {
        let mut throttle = RelayThrottle::default();
        let stale = throttle.schedule().unwrap();
        assert!(throttle.cancel());
        let fresh = throttle.schedule().unwrap();
        assert_ne!(stale, fresh);
        assert!(!throttle.fire(stale));
        assert!(throttle.fire(fresh));
        assert!(!throttle.cancel());
    }

    #[test]
    fn timer_started_is_always_instant() {
        let decision = decide(
            Some(InstantReason::TimerStarted),
            Some(at(0)),
            at(3_600_000),
            Duration::from_secs(30),
        );
        assert_eq!(decision, RelayDecision::Instant(InstantReason::TimerStarted));
    }

    #[test]
    fn language_switch_is_instant_only_early() {
        let window = Duration::from_secs(30);
        assert_eq!(
            decide(Some(InstantReason::LanguageSwitched), None, at(99_000), window),
            RelayDecision::Instant(InstantReason::LanguageSwitched)
        );
        assert_eq!(
            decide(Some(InstantReason::LanguageSwitched), Some(at(0)), at(10_000), window),
            RelayDecision::Instant(InstantReason::LanguageSwitched)
        );
        assert_eq!(
            decide(Some(InstantReason::LanguageSwitched), Some(at(0)), at(45_000), window),
            RelayDecision::Throttled { downgraded: true }
        );
    }

    #[test]
    fn plain_updates_are_throttled() {
        assert_eq!(
            decide(None, Some(at(0)), at(1), Duration::from_secs(30)),
            RelayDecision::Throttled { downgraded: false }
        );
    }
}
