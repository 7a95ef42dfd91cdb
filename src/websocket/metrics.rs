use crate::server::DuelServer;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

use super::prometheus::render_prometheus_metrics;

/// JSON metrics endpoint
pub async fn metrics_handler(State(server): State<Arc<DuelServer>>) -> Json<serde_json::Value> {
    let snapshot = server.metrics().snapshot().await;
    Json(serde_json::json!({
        "instanceId": server.instance_id(),
        "timestamp": snapshot.timestamp.to_rfc3339(),
        "connectedPlayers": server.connection_count(),
        "serverMetrics": snapshot,
    }))
}

/// Prometheus text exposition of the same snapshot
pub async fn prometheus_metrics_handler(State(server): State<Arc<DuelServer>>) -> Response {
    let snapshot = server.metrics().snapshot().await;
    let body = render_prometheus_metrics(&snapshot);
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
