//! Matchmaking queue.
//!
//! Waiters are kept in arrival order behind one lock. A waiter accepting `{easy, hard}` can pair
//! from either bucket, so pairing locks the whole queue; an identity captured by a pairing is
//! removed before the lock is released and stays reserved until [`MatchmakingQueue::release`].

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::protocol::{Difficulty, PlayerId, PlayerProfile};

/// One waiting identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub profile: PlayerProfile,
    /// Sorted, deduplicated, non-empty.
    pub difficulties: Vec<Difficulty>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn player_id(&self) -> &PlayerId {
        &self.profile.id
    }

    fn accepts(&self, difficulty: Difficulty) -> bool {
        self.difficulties.contains(&difficulty)
    }
}

/// Two waiters removed from the queue together.
#[derive(Debug, Clone)]
pub struct Pairing {
    /// The longer-waiting identity.
    pub first: QueueEntry,
    pub second: QueueEntry,
    /// Shared difficulties, most preferred first. Never empty.
    pub candidates: Vec<Difficulty>,
}

impl Pairing {
    pub fn preferred_difficulty(&self) -> Option<Difficulty> {
        self.candidates.first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// An earlier entry for the same identity was dropped.
    pub replaced: bool,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueRefused {
    #[error("player was just paired and their match is being created")]
    Matching,
    #[error("player is already in a live match")]
    InSession,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: HashMap<PlayerId, (u64, QueueEntry)>,
    /// Arrival sequence -> identity.
    order: BTreeMap<u64, PlayerId>,
    next_seq: u64,
    /// Paired identities whose session is not indexed yet.
    matching: HashSet<PlayerId>,
}

impl QueueState {
    fn remove(&mut self, player_id: &str) -> Option<QueueEntry> {
        let (seq, entry) = self.entries.remove(player_id)?;
        self.order.remove(&seq);
        Some(entry)
    }
}

#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    state: Mutex<QueueState>,
}

/// Shared difficulties of two waiters, in `priority` order.
pub fn shared_difficulties(
    a: &QueueEntry,
    b: &QueueEntry,
    priority: &[Difficulty],
) -> Vec<Difficulty> {
    priority
        .iter()
        .copied()
        .filter(|difficulty| a.accepts(*difficulty) && b.accepts(*difficulty))
        .collect()
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // both maps are updated together with no fallible step in between
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `profile` to the queue, replacing any entry it already has.
    ///
    /// `in_session` is evaluated under the queue lock, after the pairing reservation check, so an
    /// identity is either still reserved or already visible as a session participant.
    pub fn enqueue<F>(
        &self,
        profile: PlayerProfile,
        difficulties: Vec<Difficulty>,
        now: DateTime<Utc>,
        in_session: F,
    ) -> Result<EnqueueOutcome, EnqueueRefused>
    where
        F: FnOnce(&str) -> bool,
    {
        let mut state = self.lock();
        if state.matching.contains(&profile.id) {
            return Err(EnqueueRefused::Matching);
        }
        if in_session(&profile.id) {
            return Err(EnqueueRefused::InSession);
        }

        let replaced = state.remove(&profile.id).is_some();
        let seq = state.next_seq;
        state.next_seq += 1;
        let player_id = profile.id.clone();
        state.order.insert(seq, player_id.clone());
        state.entries.insert(
            player_id,
            (
                seq,
                QueueEntry {
                    profile,
                    difficulties,
                    enqueued_at: now,
                },
            ),
        );
        Ok(EnqueueOutcome {
            replaced,
            queue_size: state.entries.len(),
        })
    }

    /// Drop the reservation a pairing holds on its identities. Called once their session is
    /// indexed, or when the match could not be created.
    pub fn release(&self, player_ids: &[PlayerId]) {
        let mut state = self.lock();
        for player_id in player_ids {
            state.matching.remove(player_id);
        }
    }

    /// Remove an identity. `None` means it was not queued, including when a pairing already
    /// captured it.
    pub fn dequeue(&self, player_id: &str) -> Option<QueueEntry> {
        self.lock().remove(player_id)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.lock().entries.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pair every compatible couple of live waiters, oldest first. Paired identities are
    /// reserved until [`Self::release`].
    ///
    /// Waiters for which `is_live` is false are skipped but stay queued; see [`Self::prune`].
    pub fn take_pairs<F>(&self, priority: &[Difficulty], is_live: F) -> Vec<Pairing>
    where
        F: Fn(&str) -> bool,
    {
        let mut state = self.lock();
        let waiting: Vec<PlayerId> = state
            .order
            .values()
            .filter(|player_id| is_live(player_id))
            .cloned()
            .collect();

        let mut taken = vec![false; waiting.len()];
        let mut matches = Vec::new();
        for i in 0..waiting.len() {
            if taken[i] {
                continue;
            }
            for j in (i + 1)..waiting.len() {
                if taken[j] {
                    continue;
                }
                let (Some((_, a)), Some((_, b))) = (
                    state.entries.get(&waiting[i]),
                    state.entries.get(&waiting[j]),
                ) else {
                    continue;
                };
                let candidates = shared_difficulties(a, b, priority);
                if !candidates.is_empty() {
                    taken[i] = true;
                    taken[j] = true;
                    matches.push((i, j, candidates));
                    break;
                }
            }
        }

        matches
            .into_iter()
            .filter_map(|(i, j, candidates)| {
                let first = state.remove(&waiting[i])?;
                let second = state.remove(&waiting[j])?;
                state.matching.insert(first.player_id().clone());
                state.matching.insert(second.player_id().clone());
                Some(Pairing {
                    first,
                    second,
                    candidates,
                })
            })
            .collect()
    }

    /// Drop entries whose identity no longer has a live transport.
    pub fn prune<F>(&self, is_live: F) -> Vec<PlayerId>
    where
        F: Fn(&str) -> bool,
    {
        let mut state = self.lock();
        let stale: Vec<PlayerId> = state
            .entries
            .keys()
            .filter(|player_id| !is_live(player_id))
            .cloned()
            .collect();
        for player_id in &stale {
            state.remove(player_id);
        }
        stale
    }

    /// Empty the queue, returning the identities that were waiting.
    pub fn clear(&self) -> Vec<PlayerId> {
        let mut state = self.lock();
        state.order.clear();
        state.matching.clear();
        state.entries.drain().map(|(player_id, _)| player_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const PRIORITY: [Difficulty; 3] = Difficulty::ALL;

    fn profile(id: &str) -> PlayerProfile {
        PlayerProfile::anonymous(id)
    }

    fn live(_: &str) -> bool {
        true
    }

    fn idle(_: &str) -> bool {
        false
    }

    #[test]
    fn compatible_waiters_pair_on_preferred_difficulty() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy, Difficulty::Medium], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Easy, Difficulty::Medium], now, idle).unwrap();

        let pairs = queue.take_pairs(&PRIORITY, live);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.player_id(), "a");
        assert_eq!(pairs[0].second.player_id(), "b");
        assert_eq!(pairs[0].preferred_difficulty(), Some(Difficulty::Easy));
        assert_eq!(
            pairs[0].candidates,
            vec![Difficulty::Easy, Difficulty::Medium]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn priority_order_is_configurable() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy, Difficulty::Hard], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Easy, Difficulty::Hard], now, idle).unwrap();

        let pairs = queue.take_pairs(&[Difficulty::Hard, Difficulty::Medium, Difficulty::Easy], live);
        assert_eq!(pairs[0].preferred_difficulty(), Some(Difficulty::Hard));
    }

    #[test]
    fn disjoint_waiters_stay_queued() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Hard], now, idle).unwrap();

        assert!(queue.take_pairs(&PRIORITY, live).is_empty());
        assert_eq!(queue.len(), 2);

        queue.enqueue(profile("c"), vec![Difficulty::Hard], now, idle).unwrap();
        let pairs = queue.take_pairs(&PRIORITY, live);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.player_id(), "b");
        assert_eq!(pairs[0].second.player_id(), "c");
        assert!(queue.contains("a"));
    }

    #[test]
    fn lone_waiter_never_pairs_with_itself() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle).unwrap();
        let outcome = queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle).unwrap();
        assert!(outcome.replaced);
        assert_eq!(outcome.queue_size, 1);
        assert!(queue.take_pairs(&PRIORITY, live).is_empty());
    }

    #[test]
    fn disconnected_waiters_are_skipped_then_pruned() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("gone"), vec![Difficulty::Easy], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Easy], now, idle).unwrap();

        let is_live = |id: &str| id != "gone";
        assert!(queue.take_pairs(&PRIORITY, is_live).is_empty());
        assert_eq!(queue.prune(is_live), vec!["gone".to_string()]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn leave_after_pairing_is_a_no_op() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Medium], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Medium], now, idle).unwrap();
        assert_eq!(queue.take_pairs(&PRIORITY, live).len(), 1);
        assert!(queue.dequeue("a").is_none());
    }

    #[test]
    fn rejoin_moves_identity_to_the_back() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Hard], now, idle).unwrap();
        queue.enqueue(profile("a"), vec![Difficulty::Hard], now, idle).unwrap();
        queue.enqueue(profile("c"), vec![Difficulty::Hard], now, idle).unwrap();

        let pairs = queue.take_pairs(&PRIORITY, live);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.player_id(), "b");
        assert_eq!(pairs[0].second.player_id(), "a");
        assert!(queue.contains("c"));
    }

    #[test]
    fn paired_identities_cannot_requeue_until_released() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle).unwrap();
        queue.enqueue(profile("b"), vec![Difficulty::Easy], now, idle).unwrap();
        let pairs = queue.take_pairs(&PRIORITY, live);
        assert_eq!(pairs.len(), 1);

        assert_eq!(
            queue.enqueue(profile("a"), vec![Difficulty::Easy], now, idle),
            Err(EnqueueRefused::Matching)
        );
        assert!(queue.is_empty());

        queue.release(&["a".to_string(), "b".to_string()]);
        assert_eq!(
            queue.enqueue(profile("a"), vec![Difficulty::Easy], now, |_| true),
            Err(EnqueueRefused::InSession)
        );
        assert!(queue
            .enqueue(profile("a"), vec![Difficulty::Easy], now, idle)
            .is_ok());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(u8, Vec<Difficulty>),
        Leave(u8),
        Pair,
    }

    fn op() -> impl Strategy<Value = Op> {
        let difficulty = prop::sample::select(Difficulty::ALL.to_vec());
        prop_oneof![
            (0u8..6, prop::collection::vec(difficulty, 1..3)).prop_map(|(id, mut set)| {
                set.sort();
                set.dedup();
                Op::Join(id, set)
            }),
            (0u8..6).prop_map(Op::Leave),
            Just(Op::Pair),
        ]
    }

    proptest! {
        #[test]
        fn no_identity_is_queued_twice_or_matched_twice(ops in prop::collection::vec(op(), 1..64)) {
            let queue = MatchmakingQueue::new();
            let now = Utc::now();
            // identity -> whether its latest enqueue is still unmatched
            let mut outstanding: HashMap<String, bool> = HashMap::new();

            for op in ops {
                match op {
                    Op::Join(id, set) => {
                        let id = format!("p{id}");
                        queue.enqueue(profile(&id), set, now, idle).unwrap();
                        outstanding.insert(id, true);
                    }
                    Op::Leave(id) => {
                        let id = format!("p{id}");
                        let removed = queue.dequeue(&id).is_some();
                        let expected = outstanding.insert(id, false).unwrap_or(false);
                        prop_assert_eq!(removed, expected);
                    }
                    Op::Pair => {
                        let mut seen = HashSet::new();
                        for pairing in queue.take_pairs(&PRIORITY, live) {
                            for entry in [&pairing.first, &pairing.second] {
                                let id = entry.player_id().clone();
                                prop_assert!(seen.insert(id.clone()), "matched twice in one pass");
                                prop_assert_eq!(outstanding.insert(id, false), Some(true));
                            }
                            prop_assert_ne!(pairing.first.player_id(), pairing.second.player_id());
                            prop_assert!(!pairing.candidates.is_empty());
                            queue.release(&[
                                pairing.first.player_id().clone(),
                                pairing.second.player_id().clone(),
                            ]);
                        }
                    }
                }
                let expected_len = outstanding.values().filter(|queued| **queued).count();
                prop_assert_eq!(queue.len(), expected_len);
            }
        }
    }
}
