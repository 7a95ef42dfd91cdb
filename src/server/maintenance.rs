use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::DuelServer;
use crate::protocol::ErrorCode;

impl DuelServer {
    /// Periodic matchmaking sweep plus housekeeping. Returns once shutdown begins.
    pub async fn maintenance_task(&self) {
        let mut sweep = tokio::time::interval(Duration::from_millis(
            self.config.matchmaking.sweep_interval_ms.max(1),
        ));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut housekeeping = tokio::time::interval(Duration::from_secs(
            self.config.server.maintenance_interval_secs.max(1),
        ));
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = sweep.tick() => {
                    let started = self.run_matchmaking().await;
                    if started > 0 {
                        tracing::debug!(started, "Matchmaking sweep paired waiters");
                    }
                }
                _ = housekeeping.tick() => {
                    self.housekeeping();
                }
            }
        }
        tracing::debug!(instance_id = %self.instance_id, "Maintenance task stopped");
    }

    /// Drop queue entries without a live transport and refresh gauges.
    pub fn housekeeping(&self) -> usize {
        let pruned = self
            .queue
            .prune(|player_id| self.registry.is_connected(player_id));
        if !pruned.is_empty() {
            self.metrics.add_queue_pruned(pruned.len() as u64);
            tracing::info!(count = pruned.len(), "Pruned disconnected queue entries");
        }
        self.metrics.set_queue_size(self.queue.len());
        self.metrics.set_live_sessions(self.sessions.live_count());
        pruned.len()
    }

    /// Stop accepting work, end every session and close every transport.
    pub async fn drain(&self) {
        self.shutdown.cancel();

        let dropped = self.queue.clear();
        for player_id in &dropped {
            self.send_error_to_player(
                player_id,
                ErrorCode::ServiceUnavailable,
                "The server is shutting down.",
            )
            .await;
        }
        self.metrics.set_queue_size(0);

        let stopping = self.sessions.drain().await;
        let deadline = Duration::from_secs(self.config.server.drain_timeout_secs);
        let settled = tokio::time::timeout(deadline, async {
            while self.sessions.live_count() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .is_ok();
        if !settled {
            tracing::warn!(
                remaining = self.sessions.live_count(),
                "Sessions still live after drain timeout"
            );
        }

        let closed = self.registry.close_all();
        tracing::info!(
            dequeued = dropped.len(),
            sessions = stopping,
            transports = closed,
            "Server drained"
        );
    }
}
