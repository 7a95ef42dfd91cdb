// WebSocket module - transport and HTTP surface of the duel server
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-transport read/write loops
// - sending: frame serialization
// - routes: HTTP route setup (health, queue status, reactions, metrics)
// - metrics: JSON metrics endpoint
// - prometheus: Prometheus metrics rendering

mod connection;
mod handler;
mod metrics;
mod prometheus;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::{metrics_handler, prometheus_metrics_handler};
pub use routes::{create_router, send_emoji_handler, SendEmojiRequest};
