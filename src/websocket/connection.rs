use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{ClientConnection, DuelServer};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::sending::{send_text_message, FrameSink};

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<DuelServer>) {
    let (sender, mut receiver) = socket.split();
    let queue_capacity = server.config().websocket.outbound_queue_capacity.max(1);
    let (tx, rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);
    let cancel = CancellationToken::new();

    let mut connection = ClientConnection::new(tx, cancel.clone());
    server.connect(&connection);
    let connection_id = connection.connection_id;

    let ping_interval =
        Duration::from_secs(server.config().websocket.ping_interval_secs.max(1));
    let send_task = tokio::spawn(write_loop(sender, rx, ping_interval, cancel.clone()));

    let max_size = server.config().security.max_message_size;
    let idle_timeout = Duration::from_secs(server.config().websocket.idle_timeout_secs.max(1));
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = tokio::time::timeout(idle_timeout, receiver.next()) => frame,
        };
        let msg = match frame {
            Err(_) => {
                tracing::info!(%connection_id, "Closing idle connection");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                tracing::debug!(%connection_id, %err, "WebSocket error");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => {
                if text.len() > max_size {
                    tracing::warn!(
                        %connection_id,
                        size = text.len(),
                        max = max_size,
                        "Message exceeds size limit"
                    );
                    reject(
                        &server,
                        &connection,
                        ErrorCode::MessageTooLarge,
                        format!("Message too large ({} bytes, max {max_size} bytes)", text.len()),
                    );
                    continue;
                }

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_message) => {
                        server
                            .handle_client_message(&mut connection, client_message)
                            .await;
                    }
                    Err(err) => {
                        tracing::debug!(%connection_id, %err, "Unparseable client frame");
                        reject(
                            &server,
                            &connection,
                            ErrorCode::InvalidInput,
                            format!("Invalid message format: {err}"),
                        );
                    }
                }
            }
            Message::Binary(_) => {
                reject(
                    &server,
                    &connection,
                    ErrorCode::InvalidInput,
                    "Binary frames are not supported",
                );
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    server.disconnect(&connection).await;
    cancel.cancel();
    drop(connection);
    if let Err(err) = send_task.await {
        server.metrics().increment_internal_errors();
        tracing::error!(%connection_id, %err, "Send task ended abnormally");
    }
    tracing::debug!(%connection_id, "WebSocket connection closed");
}

fn reject(
    server: &DuelServer,
    connection: &ClientConnection,
    code: ErrorCode,
    message: impl Into<String>,
) {
    server.metrics().increment_protocol_errors();
    server.reply(connection, ServerMessage::error(code, message));
}

/// Drain the outbound queue into the socket, pinging between messages so a quiet but live
/// client answers with pongs and is not closed as idle. On cancellation, flush what is already
/// queued and close.
async fn write_loop(
    mut sender: FrameSink,
    mut rx: mpsc::Receiver<Arc<ServerMessage>>,
    ping_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            message = rx.recv() => {
                let Some(message) = message else { break };
                if send_text_message(&mut sender, &message).await.is_err() {
                    return;
                }
            }
            () = cancel.cancelled() => {
                while let Ok(message) = rx.try_recv() {
                    if send_text_message(&mut sender, &message).await.is_err() {
                        return;
                    }
                }
                break;
            }
            _ = ping.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    tracing::debug!("Failed to send ping, connection closed");
                    return;
                }
            }
        }
    }
    let _ = sender.close().await;
}
