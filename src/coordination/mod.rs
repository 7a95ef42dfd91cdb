//! Outbound message delivery.
//!
//! Session actors and request handlers never touch transports directly. They address players by
//! identity through a [`MessageCoordinator`]; the [`ConnectionRegistry`] is the in-process
//! implementation that resolves an identity to its single live transport.

pub mod registry;

pub use registry::{ConnectionRecord, ConnectionRegistry};

use crate::protocol::{PlayerId, ServerMessage};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait MessageCoordinator: Send + Sync {
    /// Deliver to the identity's live transport. An identity without one is not an error.
    async fn send_to_player(&self, player_id: &str, message: Arc<ServerMessage>)
        -> anyhow::Result<()>;

    async fn send_to_players(
        &self,
        player_ids: &[PlayerId],
        message: Arc<ServerMessage>,
    ) -> anyhow::Result<()> {
        for player_id in player_ids {
            self.send_to_player(player_id, Arc::clone(&message)).await?;
        }
        Ok(())
    }

    fn is_connected(&self, player_id: &str) -> bool;
}
