mod test_helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use codeduel_server::protocol::*;
use codeduel_server::websocket::create_router;
use serde_json::json;
use std::sync::Arc;
use test_helpers::{create_test_server, start_duel, TestClient};
use tower::ServiceExt;
use uuid::Uuid;

fn test_server(server: &Arc<codeduel_server::server::DuelServer>) -> axum_test::TestServer {
    let app = create_router("*").with_state(Arc::clone(server));
    axum_test::TestServer::new(app).expect("test server should start")
}

// ===========================================================================
// Health and status
// ===========================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = create_test_server();
    let response = test_server(&server).get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_health_endpoint_reports_draining() {
    let server = create_test_server();
    server.drain().await;

    let response = test_server(&server).get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_queue_status_counts_waiters() {
    let server = create_test_server();
    let mut alice = TestClient::connect(&server);
    alice.join_queue("alice", &[Difficulty::Hard]).await;

    let response = test_server(&server).get("/v1/queue/status").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["queue_size"], 1);
    assert_eq!(body["live_sessions"], 0);
}

// ===========================================================================
// Metrics
// ===========================================================================

#[tokio::test]
async fn test_metrics_endpoint_returns_snapshot() {
    let server = create_test_server();
    let _client = TestClient::connect(&server);

    let response = test_server(&server).get("/metrics").await;

    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["serverMetrics"]["connections"]["total_connections"], 1);
    assert!(json.get("instanceId").is_some());
}

#[tokio::test]
async fn test_prometheus_endpoint_is_text() {
    let server = create_test_server();
    let app = create_router("*").with_state(server);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics/prom")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("# TYPE codeduel_connections_total counter"));
}

// ===========================================================================
// Reactions over request/response
// ===========================================================================

#[tokio::test]
async fn test_send_emoji_reaches_the_opponent() {
    let server = create_test_server();
    let (_alice, mut bob, session_id) = start_duel(&server).await;

    let response = test_server(&server)
        .post(&format!("/v1/games/{session_id}/send-emoji"))
        .json(&json!({ "emoji": "👏", "sender": "alice" }))
        .await;

    response.assert_status_ok();
    match &*bob.next_named("emoji_received").await {
        ServerMessage::EmojiReceived { emoji, from, .. } => {
            assert_eq!(emoji, "👏");
            assert_eq!(from, "alice");
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[tokio::test]
async fn test_send_emoji_cooldown_is_429() {
    let server = create_test_server();
    let (_alice, _bob, session_id) = start_duel(&server).await;
    let http = test_server(&server);
    let path = format!("/v1/games/{session_id}/send-emoji");

    http.post(&path)
        .json(&json!({ "emoji": "🔥", "sender": "alice" }))
        .await
        .assert_status_ok();
    let response = http
        .post(&path)
        .json(&json!({ "emoji": "🔥", "sender": "alice" }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "REACTION_COOLDOWN");
}

#[tokio::test]
async fn test_send_emoji_rejections() {
    let server = create_test_server();
    let (_alice, _bob, session_id) = start_duel(&server).await;
    let http = test_server(&server);

    http.post(&format!("/v1/games/{}/send-emoji", Uuid::new_v4()))
        .json(&json!({ "emoji": "🔥", "sender": "alice" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    http.post(&format!("/v1/games/{session_id}/send-emoji"))
        .json(&json!({ "emoji": "🔥", "sender": "carol" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    http.post(&format!("/v1/games/{session_id}/send-emoji"))
        .json(&json!({ "emoji": "", "sender": "alice" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
