use crate::metrics::{MetricsSnapshot, OperationLatencyMetrics};
use std::fmt::Write;

const PREFIX: &str = "codeduel";

fn write_metric(buf: &mut String, name: &str, help: &str, metric_type: &str, value: f64) {
    let _ = writeln!(buf, "# HELP {PREFIX}_{name} {help}");
    let _ = writeln!(buf, "# TYPE {PREFIX}_{name} {metric_type}");
    let _ = writeln!(buf, "{PREFIX}_{name} {value}");
}

fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
    write_metric(buf, name, help, "counter", value as f64);
}

fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
    write_metric(buf, name, help, "gauge", value as f64);
}

fn emit_latency_metrics(
    buf: &mut String,
    metric_prefix: &str,
    description: &str,
    metrics: &OperationLatencyMetrics,
) {
    let quantiles = [
        ("average", "Average", metrics.average_ms),
        ("p50", "p50", metrics.p50_ms),
        ("p95", "p95", metrics.p95_ms),
        ("p99", "p99", metrics.p99_ms),
        ("min", "Minimum observed", metrics.min_ms),
        ("max", "Maximum observed", metrics.max_ms),
    ];
    for (suffix, label, value) in quantiles {
        if let Some(value) = value {
            write_metric(
                buf,
                &format!("{metric_prefix}_{suffix}_ms"),
                &format!("{label} {description} latency in milliseconds"),
                "gauge",
                value,
            );
        }
    }
    counter(
        buf,
        &format!("{metric_prefix}_samples_total"),
        &format!("Total samples recorded for {description} latency"),
        metrics.sample_count,
    );
}

/// Render a metrics snapshot in the Prometheus text exposition format.
pub(crate) fn render_prometheus_metrics(snapshot: &MetricsSnapshot) -> String {
    let mut buf = String::new();
    let connections = &snapshot.connections;
    counter(
        &mut buf,
        "connections_total",
        "Transports accepted since startup",
        connections.total_connections,
    );
    gauge(
        &mut buf,
        "connections_active",
        "Currently open transports",
        connections.active_connections,
    );
    counter(
        &mut buf,
        "connections_disconnections_total",
        "Transport closures since startup",
        connections.disconnections,
    );
    counter(
        &mut buf,
        "connections_displaced_total",
        "Transports replaced by a newer one for the same identity",
        connections.connections_displaced,
    );
    counter(
        &mut buf,
        "websocket_messages_dropped_total",
        "Server messages dropped because the outbound queue was full",
        connections.websocket_messages_dropped,
    );
    counter(
        &mut buf,
        "stale_messages_ignored_total",
        "Events ignored from displaced transports",
        connections.stale_messages_ignored,
    );

    let matchmaking = &snapshot.matchmaking;
    gauge(&mut buf, "queue_size", "Players waiting for a match", matchmaking.queue_size);
    counter(&mut buf, "queue_joins_total", "Matchmaking queue joins", matchmaking.queue_joins);
    counter(&mut buf, "queue_leaves_total", "Matchmaking queue leaves", matchmaking.queue_leaves);
    counter(
        &mut buf,
        "queue_pruned_total",
        "Queue entries pruned for lack of a transport",
        matchmaking.queue_pruned,
    );
    counter(&mut buf, "matches_created_total", "Matches created", matchmaking.matches_created);
    counter(
        &mut buf,
        "matches_without_question_total",
        "Pairings dropped because no question was available",
        matchmaking.matches_without_question,
    );

    let sessions = &snapshot.sessions;
    gauge(&mut buf, "sessions_live", "Sessions not yet retired", sessions.live_sessions);
    counter(&mut buf, "sessions_started_total", "Sessions that reached running", sessions.started);
    counter(
        &mut buf,
        "sessions_completed_total",
        "Sessions won by a passing submission",
        sessions.completed,
    );
    counter(
        &mut buf,
        "sessions_forfeited_total",
        "Sessions ended by disconnection",
        sessions.forfeited,
    );
    counter(
        &mut buf,
        "sessions_abandoned_total",
        "Sessions ended by a player leaving",
        sessions.abandoned,
    );
    counter(
        &mut buf,
        "sessions_cancelled_total",
        "Sessions discarded before they started",
        sessions.cancelled,
    );
    counter(
        &mut buf,
        "sessions_expired_total",
        "Sessions cancelled by the join timeout",
        sessions.expired,
    );

    let code_sync = &snapshot.code_sync;
    counter(&mut buf, "code_updates_total", "Code updates received", code_sync.code_updates);
    counter(
        &mut buf,
        "relays_throttled_total",
        "Throttled code relays delivered",
        code_sync.relays_throttled,
    );
    counter(
        &mut buf,
        "relays_instant_total",
        "Instant code relays delivered",
        code_sync.relays_instant,
    );
    counter(
        &mut buf,
        "relays_superseded_total",
        "Pending throttled relays replaced by an instant relay",
        code_sync.relays_superseded,
    );
    counter(
        &mut buf,
        "instant_downgraded_total",
        "Instant requests relayed at the throttled cadence",
        code_sync.instant_downgraded,
    );

    counter(&mut buf, "reactions_accepted_total", "Reactions relayed", snapshot.reactions.accepted);
    counter(
        &mut buf,
        "reactions_dropped_total",
        "Reactions rejected by the cooldown",
        snapshot.reactions.dropped,
    );

    let judge = &snapshot.judge;
    counter(&mut buf, "judge_sample_runs_total", "Sample runs requested", judge.sample_runs);
    counter(&mut buf, "judge_submissions_total", "Full submissions requested", judge.submissions);
    counter(&mut buf, "judge_failures_total", "Judge calls that failed", judge.failures);
    emit_latency_metrics(
        &mut buf,
        "judge_run_sample_latency",
        "judge sample run",
        &judge.run_sample_latency,
    );
    emit_latency_metrics(
        &mut buf,
        "judge_run_all_latency",
        "judge full run",
        &judge.run_all_latency,
    );
    counter(
        &mut buf,
        "judge_latency_clamped_samples_total",
        "Latency samples clamped into the histogram range",
        judge.latency_histogram_clamped_samples,
    );

    counter(
        &mut buf,
        "protocol_errors_total",
        "Client requests rejected",
        snapshot.errors.protocol_errors,
    );
    counter(
        &mut buf,
        "internal_errors_total",
        "Internal failures",
        snapshot.errors.internal_errors,
    );

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ServerMetrics, JUDGE_RUN_ALL};
    use std::time::Duration;

    #[tokio::test]
    async fn renders_core_counters() {
        let metrics = ServerMetrics::new();
        metrics.increment_connections();
        metrics.increment_connections();
        metrics.decrement_active_connections();
        metrics.increment_reactions_dropped();
        metrics.set_queue_size(3);

        let rendered = render_prometheus_metrics(&metrics.snapshot().await);

        assert!(rendered.contains("codeduel_connections_total 2"));
        assert!(rendered.contains("codeduel_connections_active 1"));
        assert!(rendered.contains("codeduel_reactions_dropped_total 1"));
        assert!(rendered.contains("# TYPE codeduel_queue_size gauge"));
        assert!(rendered.contains("codeduel_queue_size 3"));
        assert!(rendered.contains("codeduel_judge_run_all_latency_samples_total 0"));
        assert!(!rendered.contains("codeduel_judge_run_all_latency_p50_ms"));
    }

    #[tokio::test]
    async fn latency_quantiles_appear_once_sampled() {
        let metrics = ServerMetrics::new();
        metrics
            .record_judge_latency(JUDGE_RUN_ALL, Duration::from_millis(40))
            .await;

        let rendered = render_prometheus_metrics(&metrics.snapshot().await);

        assert!(rendered.contains("codeduel_judge_run_all_latency_samples_total 1"));
        assert!(rendered.contains("codeduel_judge_run_all_latency_p50_ms"));
    }
}
