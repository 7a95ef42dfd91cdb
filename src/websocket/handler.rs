use crate::server::DuelServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the duel protocol
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<DuelServer>>,
) -> Response {
    let max_message_size = server.config().security.max_message_size;
    ws.max_message_size(max_message_size.saturating_mul(2))
        .on_upgrade(move |socket| handle_socket(socket, server))
}
