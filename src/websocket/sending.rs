use crate::protocol::ServerMessage;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

pub(super) type FrameSink = SplitSink<WebSocket, Message>;

/// Serialize one event into a text frame and write it. `Err` means the socket is gone.
pub(super) async fn send_text_message(
    sender: &mut FrameSink,
    message: &ServerMessage,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(event = message.event_name(), %err, "Failed to serialize message");
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::debug!(event = message.event_name(), "Failed to send message, connection closed");
        return Err(());
    }
    Ok(())
}
