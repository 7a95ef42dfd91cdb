//! Live session table and finished-outcome cache.

use dashmap::DashMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, info_span, Instrument};

use super::actor::{SessionActor, SessionContext, SessionHandle};
use super::Session;
use crate::protocol::{GameCompletedPayload, PlayerId, SessionId};

/// Bounded cache of terminal outcomes, keyed by session.
pub struct FinishedOutcomes {
    cache: Mutex<LruCache<SessionId, Arc<GameCompletedPayload>>>,
}

impl FinishedOutcomes {
    pub fn new(capacity: usize) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN));
        Self {
            cache: Mutex::new(cache),
        }
    }

    pub async fn record(&self, session_id: SessionId, outcome: Arc<GameCompletedPayload>) {
        self.cache.lock().await.put(session_id, outcome);
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<GameCompletedPayload>> {
        self.cache.lock().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

pub struct SessionStore {
    live: DashMap<SessionId, SessionHandle>,
    by_player: DashMap<PlayerId, SessionId>,
    outcomes: Arc<FinishedOutcomes>,
}

impl SessionStore {
    pub fn new(finished_retention: usize) -> Self {
        Self {
            live: DashMap::new(),
            by_player: DashMap::new(),
            outcomes: Arc::new(FinishedOutcomes::new(finished_retention)),
        }
    }

    pub fn outcomes(&self) -> Arc<FinishedOutcomes> {
        Arc::clone(&self.outcomes)
    }

    /// Start the actor for `session` and index it by id and by both participants.
    pub fn spawn(self: &Arc<Self>, session: Session, ctx: SessionContext) -> SessionHandle {
        let (tx, rx) = mpsc::channel(ctx.policy.command_capacity.max(1));
        let handle = SessionHandle::new(&session, tx.clone());
        let session_id = session.id;

        for player_id in handle.participants() {
            self.by_player.insert(player_id.clone(), session_id);
        }
        self.live.insert(session_id, handle.clone());

        let actor = SessionActor::new(session, ctx, rx, tx);
        let store = Arc::clone(self);
        let span = info_span!("session", %session_id);
        tokio::spawn(
            async move {
                let outcome = actor.run().await;
                store.retire(session_id, outcome.is_some());
            }
            .instrument(span),
        );
        handle
    }

    fn retire(&self, session_id: SessionId, completed: bool) {
        if let Some((_, handle)) = self.live.remove(&session_id) {
            for player_id in handle.participants() {
                self.by_player
                    .remove_if(player_id, |_, live| *live == session_id);
            }
        }
        info!(completed, "Session retired");
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.live.get(session_id).map(|entry| entry.value().clone())
    }

    /// The live session `player_id` takes part in, if any.
    pub fn session_of(&self, player_id: &str) -> Option<SessionHandle> {
        let session_id = *self.by_player.get(player_id)?;
        self.get(&session_id)
    }

    pub async fn finished_outcome(
        &self,
        session_id: &SessionId,
    ) -> Option<Arc<GameCompletedPayload>> {
        self.outcomes.get(session_id).await
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Stop every live actor. Each one notifies its participants before exiting.
    pub async fn drain(&self) -> usize {
        let handles: Vec<SessionHandle> = self
            .live
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in &handles {
            handle.shutdown().await;
        }
        handles.len()
    }
}
