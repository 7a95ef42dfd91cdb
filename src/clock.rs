//! Match clock.
//!
//! Every elapsed-time figure the server produces is derived from the session's single
//! authoritative `start_time`; nothing keeps a second running counter.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time since `start`, saturating to zero when `now` precedes it.
pub fn elapsed(now: DateTime<Utc>, start: DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or(Duration::ZERO)
}

/// Milliseconds since `start`, or zero for a match that has not started.
pub fn elapsed_ms(now: DateTime<Utc>, start: Option<DateTime<Utc>>) -> u64 {
    start.map_or(0, |start| {
        u64::try_from(elapsed(now, start).as_millis()).unwrap_or(u64::MAX)
    })
}

/// Whether `now` is still inside `window` of `start`.
pub fn within(now: DateTime<Utc>, start: DateTime<Utc>, window: Duration) -> bool {
    elapsed(now, start) <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn elapsed_before_start_is_zero() {
        assert_eq!(elapsed(at(1_000), at(5_000)), Duration::ZERO);
        assert_eq!(elapsed_ms(at(1_000), None), 0);
    }

    #[test]
    fn window_is_inclusive() {
        let start = at(0);
        assert!(within(at(30_000), start, Duration::from_secs(30)));
        assert!(!within(at(30_001), start, Duration::from_secs(30)));
    }

    proptest! {
        #[test]
        fn elapsed_matches_wall_clock_difference(
            start in 0i64..4_000_000_000_000,
            offset in 0i64..86_400_000,
        ) {
            let ms = elapsed_ms(at(start + offset), Some(at(start)));
            prop_assert_eq!(ms, offset as u64);
        }

        #[test]
        fn elapsed_is_monotonic_in_now(start in 0i64..1_000_000, a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(elapsed(at(lo), at(start)) <= elapsed(at(hi), at(start)));
        }
    }
}
