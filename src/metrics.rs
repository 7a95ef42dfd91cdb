use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Process-wide counters and gauges for the duel server
#[derive(Debug)]
pub struct ServerMetrics {
    // Transport
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub connections_displaced: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,
    pub stale_messages_ignored: AtomicU64,

    // Matchmaking
    pub queue_joins: AtomicU64,
    pub queue_leaves: AtomicU64,
    pub queue_pruned: AtomicU64,
    pub matches_created: AtomicU64,
    pub matches_without_question: AtomicU64,
    pub queue_size: AtomicU64,

    // Sessions
    pub live_sessions: AtomicU64,
    pub sessions_started: AtomicU64,
    pub sessions_completed: AtomicU64,
    pub sessions_forfeited: AtomicU64,
    pub sessions_abandoned: AtomicU64,
    pub sessions_cancelled: AtomicU64,
    pub sessions_expired: AtomicU64,

    // Code sync
    pub code_updates: AtomicU64,
    pub relays_throttled: AtomicU64,
    pub relays_instant: AtomicU64,
    pub relays_superseded: AtomicU64,
    pub instant_downgraded: AtomicU64,

    // Reactions
    pub reactions_accepted: AtomicU64,
    pub reactions_dropped: AtomicU64,

    // Submissions
    pub sample_runs: AtomicU64,
    pub submissions: AtomicU64,
    pub judge_failures: AtomicU64,
    pub judge_latency: Arc<RwLock<LatencyTracker>>,
    pub latency_histogram_clamped_samples: AtomicU64,

    // Errors
    pub protocol_errors: AtomicU64,
    pub internal_errors: AtomicU64,
}

/// Per-operation latency histograms.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    operations: HashMap<String, OperationLatencyHistogram>,
    lowest_discernible_micros: u64,
    highest_trackable_micros: u64,
    significant_figures: u8,
}

const DEFAULT_LOWEST_DISCERNIBLE_MICROS: u64 = 1;
const DEFAULT_HIGHEST_TRACKABLE_MICROS: u64 = 300_000_000;
const DEFAULT_SIGNIFICANT_FIGURES: u8 = 3;

/// Judge operation labels used as latency keys.
pub const JUDGE_RUN_SAMPLE: &str = "run_sample";
pub const JUDGE_RUN_ALL: &str = "run_all";

#[derive(Debug, Clone)]
struct OperationLatencyHistogram {
    histogram: Option<Histogram<u64>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub matchmaking: MatchmakingMetrics,
    pub sessions: SessionMetrics,
    pub code_sync: CodeSyncMetrics,
    pub reactions: ReactionMetrics,
    pub judge: JudgeMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub connections_displaced: u64,
    pub websocket_messages_dropped: u64,
    pub stale_messages_ignored: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchmakingMetrics {
    pub queue_size: u64,
    pub queue_joins: u64,
    pub queue_leaves: u64,
    pub queue_pruned: u64,
    pub matches_created: u64,
    pub matches_without_question: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionMetrics {
    pub live_sessions: u64,
    pub started: u64,
    pub completed: u64,
    pub forfeited: u64,
    pub abandoned: u64,
    pub cancelled: u64,
    pub expired: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CodeSyncMetrics {
    pub code_updates: u64,
    pub relays_throttled: u64,
    pub relays_instant: u64,
    pub relays_superseded: u64,
    pub instant_downgraded: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReactionMetrics {
    pub accepted: u64,
    pub dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JudgeMetrics {
    pub sample_runs: u64,
    pub submissions: u64,
    pub failures: u64,
    pub run_sample_latency: OperationLatencyMetrics,
    pub run_all_latency: OperationLatencyMetrics,
    pub latency_histogram_clamped_samples: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct OperationLatencyMetrics {
    pub average_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub sample_count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMetrics {
    pub protocol_errors: u64,
    pub internal_errors: u64,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            disconnections: AtomicU64::new(0),
            connections_displaced: AtomicU64::new(0),
            websocket_messages_dropped: AtomicU64::new(0),
            stale_messages_ignored: AtomicU64::new(0),
            queue_joins: AtomicU64::new(0),
            queue_leaves: AtomicU64::new(0),
            queue_pruned: AtomicU64::new(0),
            matches_created: AtomicU64::new(0),
            matches_without_question: AtomicU64::new(0),
            queue_size: AtomicU64::new(0),
            live_sessions: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_forfeited: AtomicU64::new(0),
            sessions_abandoned: AtomicU64::new(0),
            sessions_cancelled: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            code_updates: AtomicU64::new(0),
            relays_throttled: AtomicU64::new(0),
            relays_instant: AtomicU64::new(0),
            relays_superseded: AtomicU64::new(0),
            instant_downgraded: AtomicU64::new(0),
            reactions_accepted: AtomicU64::new(0),
            reactions_dropped: AtomicU64::new(0),
            sample_runs: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            judge_failures: AtomicU64::new(0),
            judge_latency: Arc::new(RwLock::new(LatencyTracker::new())),
            latency_histogram_clamped_samples: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
        }
    }

    // Transport
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // fetch_update so a double close never wraps the gauge
        let _ =
            self.active_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    current.checked_sub(1)
                });
        bump(&self.disconnections);
    }

    pub fn increment_connections_displaced(&self) {
        bump(&self.connections_displaced);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        bump(&self.websocket_messages_dropped);
    }

    pub fn increment_stale_messages_ignored(&self) {
        bump(&self.stale_messages_ignored);
    }

    // Matchmaking
    pub fn increment_queue_joins(&self) {
        bump(&self.queue_joins);
    }

    pub fn increment_queue_leaves(&self) {
        bump(&self.queue_leaves);
    }

    pub fn add_queue_pruned(&self, count: u64) {
        self.queue_pruned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_matches_created(&self) {
        bump(&self.matches_created);
    }

    pub fn increment_matches_without_question(&self) {
        bump(&self.matches_without_question);
    }

    pub fn set_queue_size(&self, size: usize) {
        self.queue_size.store(size as u64, Ordering::Relaxed);
    }

    // Sessions
    pub fn set_live_sessions(&self, count: usize) {
        self.live_sessions.store(count as u64, Ordering::Relaxed);
    }

    pub fn increment_sessions_started(&self) {
        bump(&self.sessions_started);
    }

    pub fn increment_sessions_completed(&self) {
        bump(&self.sessions_completed);
    }

    pub fn increment_sessions_forfeited(&self) {
        bump(&self.sessions_forfeited);
    }

    pub fn increment_sessions_abandoned(&self) {
        bump(&self.sessions_abandoned);
    }

    pub fn increment_sessions_cancelled(&self) {
        bump(&self.sessions_cancelled);
    }

    pub fn increment_sessions_expired(&self) {
        bump(&self.sessions_expired);
    }

    // Code sync
    pub fn increment_code_updates(&self) {
        bump(&self.code_updates);
    }

    pub fn increment_relays_throttled(&self) {
        bump(&self.relays_throttled);
    }

    pub fn increment_relays_instant(&self) {
        bump(&self.relays_instant);
    }

    pub fn increment_relays_superseded(&self) {
        bump(&self.relays_superseded);
    }

    pub fn increment_instant_downgraded(&self) {
        bump(&self.instant_downgraded);
    }

    // Reactions
    pub fn increment_reactions_accepted(&self) {
        bump(&self.reactions_accepted);
    }

    pub fn increment_reactions_dropped(&self) {
        bump(&self.reactions_dropped);
    }

    // Submissions
    pub fn increment_sample_runs(&self) {
        bump(&self.sample_runs);
    }

    pub fn increment_submissions(&self) {
        bump(&self.submissions);
    }

    pub fn increment_judge_failures(&self) {
        bump(&self.judge_failures);
    }

    pub async fn record_judge_latency(&self, operation: &str, duration: Duration) {
        let clamped = self
            .judge_latency
            .write()
            .await
            .add_sample(operation, duration);
        if clamped {
            bump(&self.latency_histogram_clamped_samples);
        }
    }

    // Errors
    pub fn increment_protocol_errors(&self) {
        bump(&self.protocol_errors);
    }

    pub fn increment_internal_errors(&self) {
        bump(&self.internal_errors);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let tracker = self.judge_latency.read().await;
        let run_sample_latency = tracker
            .get_latency_metrics(JUDGE_RUN_SAMPLE)
            .unwrap_or_default();
        let run_all_latency = tracker
            .get_latency_metrics(JUDGE_RUN_ALL)
            .unwrap_or_default();
        drop(tracker);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: load(&self.total_connections),
                active_connections: load(&self.active_connections),
                disconnections: load(&self.disconnections),
                connections_displaced: load(&self.connections_displaced),
                websocket_messages_dropped: load(&self.websocket_messages_dropped),
                stale_messages_ignored: load(&self.stale_messages_ignored),
            },
            matchmaking: MatchmakingMetrics {
                queue_size: load(&self.queue_size),
                queue_joins: load(&self.queue_joins),
                queue_leaves: load(&self.queue_leaves),
                queue_pruned: load(&self.queue_pruned),
                matches_created: load(&self.matches_created),
                matches_without_question: load(&self.matches_without_question),
            },
            sessions: SessionMetrics {
                live_sessions: load(&self.live_sessions),
                started: load(&self.sessions_started),
                completed: load(&self.sessions_completed),
                forfeited: load(&self.sessions_forfeited),
                abandoned: load(&self.sessions_abandoned),
                cancelled: load(&self.sessions_cancelled),
                expired: load(&self.sessions_expired),
            },
            code_sync: CodeSyncMetrics {
                code_updates: load(&self.code_updates),
                relays_throttled: load(&self.relays_throttled),
                relays_instant: load(&self.relays_instant),
                relays_superseded: load(&self.relays_superseded),
                instant_downgraded: load(&self.instant_downgraded),
            },
            reactions: ReactionMetrics {
                accepted: load(&self.reactions_accepted),
                dropped: load(&self.reactions_dropped),
            },
            judge: JudgeMetrics {
                sample_runs: load(&self.sample_runs),
                submissions: load(&self.submissions),
                failures: load(&self.judge_failures),
                run_sample_latency,
                run_all_latency,
                latency_histogram_clamped_samples: load(&self.latency_histogram_clamped_samples),
            },
            errors: ErrorMetrics {
                protocol_errors: load(&self.protocol_errors),
                internal_errors: load(&self.internal_errors),
            },
        }
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::with_bounds(
            DEFAULT_LOWEST_DISCERNIBLE_MICROS,
            DEFAULT_HIGHEST_TRACKABLE_MICROS,
            DEFAULT_SIGNIFICANT_FIGURES,
        )
    }

    fn with_bounds(
        lowest_discernible_micros: u64,
        highest_trackable_micros: u64,
        significant_figures: u8,
    ) -> Self {
        Self {
            operations: HashMap::new(),
            lowest_discernible_micros: lowest_discernible_micros.max(1),
            highest_trackable_micros: highest_trackable_micros
                .max(lowest_discernible_micros.max(1)),
            significant_figures: significant_figures.clamp(1, 5),
        }
    }

    /// Record one sample; returns `true` when it exceeded the trackable range and was clamped.
    pub fn add_sample(&mut self, operation: &str, duration: Duration) -> bool {
        let micros = duration_to_micros(duration);
        let lowest = self.lowest_discernible_micros;
        let highest = self.highest_trackable_micros;
        let significant = self.significant_figures;
        let histogram = self
            .operations
            .entry(operation.to_string())
            .or_insert_with(|| OperationLatencyHistogram::new(lowest, highest, significant));

        histogram.record(micros, highest)
    }

    pub fn get_latency_metrics(&self, operation: &str) -> Option<OperationLatencyMetrics> {
        self.operations.get(operation)?.metrics()
    }
}

impl OperationLatencyHistogram {
    fn new(lowest: u64, highest: u64, significant_figures: u8) -> Self {
        // Fall back to an auto-resizing histogram when the bounds are rejected.
        let histogram = Histogram::new_with_bounds(lowest, highest, significant_figures)
            .or_else(|e| {
                tracing::warn!(
                    target: "metrics",
                    error = %e,
                    lowest,
                    highest,
                    "Failed to create bounded latency histogram, using auto-resizing fallback"
                );
                Histogram::new(2)
            })
            .ok();

        if histogram.is_none() {
            tracing::error!(target: "metrics", "Latency histogram unavailable; samples will be dropped");
        }

        Self { histogram }
    }

    fn record(&mut self, micros: u64, highest_trackable_micros: u64) -> bool {
        let was_clamped = micros > highest_trackable_micros;
        let value = micros.min(highest_trackable_micros);
        if let Some(histogram) = self.histogram.as_mut() {
            if let Err(error) = histogram.record(value) {
                tracing::warn!(target: "metrics", %error, value, "failed to record latency sample");
            }
        }
        was_clamped
    }

    fn metrics(&self) -> Option<OperationLatencyMetrics> {
        let histogram = self.histogram.as_ref()?;
        if histogram.is_empty() {
            return None;
        }
        let at = |percentile: f64| histogram.value_at_percentile(percentile) as f64 / MICROS_PER_MS;

        Some(OperationLatencyMetrics {
            average_ms: Some(histogram.mean() / MICROS_PER_MS),
            p50_ms: Some(at(50.0)),
            p95_ms: Some(at(95.0)),
            p99_ms: Some(at(99.0)),
            min_ms: Some(histogram.min() as f64 / MICROS_PER_MS),
            max_ms: Some(histogram.max() as f64 / MICROS_PER_MS),
            sample_count: histogram.len(),
        })
    }
}

const MICROS_PER_MS: f64 = 1000.0;

fn duration_to_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
