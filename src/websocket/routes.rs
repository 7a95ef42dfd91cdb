use crate::protocol::{ErrorCode, PlayerId, SessionId};
use crate::server::{DuelServer, ProtocolViolation};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use std::sync::Arc;

use super::handler::websocket_handler;
use super::metrics::{metrics_handler, prometheus_metrics_handler};

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<DuelServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/v1/ws", get(websocket_handler))
        .route("/v1/games/{session_id}/send-emoji", post(send_emoji_handler))
        .route("/v1/queue/status", get(queue_status))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/prom", get(prometheus_metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(
    State(server): State<Arc<DuelServer>>,
) -> axum::response::Result<&'static str> {
    if server.health_check().await {
        Ok("OK")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

async fn queue_status(State(server): State<Arc<DuelServer>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "queue_size": server.queue_len(),
        "live_sessions": server.sessions().live_count(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendEmojiRequest {
    pub emoji: String,
    pub sender: PlayerId,
}

/// Request/response form of `send-emoji`.
pub async fn send_emoji_handler(
    State(server): State<Arc<DuelServer>>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<SendEmojiRequest>,
) -> Response {
    match server
        .send_reaction(session_id, &request.sender, request.emoji)
        .await
    {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(violation) => rejection(&violation),
    }
}

fn rejection(violation: &ProtocolViolation) -> Response {
    let code = violation.error_code();
    let status = match code {
        ErrorCode::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorCode::NotAParticipant => StatusCode::FORBIDDEN,
        ErrorCode::ReactionCooldown => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::InvalidSessionState => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    let body = Json(serde_json::json!({
        "success": false,
        "error": violation.to_string(),
        "error_code": code,
    }));
    (status, body).into_response()
}
