use crate::catalog::{InMemoryQuestionCatalog, QuestionCatalog};
use crate::config::Config;
use crate::coordination::{ConnectionRegistry, MessageCoordinator};
use crate::judge::{self, Judge};
use crate::matchmaking::MatchmakingQueue;
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ErrorCode, PlayerId, ServerMessage};
use crate::session::actor::SessionContext;
use crate::session::{SessionError, SessionPolicy, SessionStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

mod connections;
mod game_service;
mod maintenance;
mod message_router;
mod messaging;
mod queue_service;
mod submission_service;
#[cfg(test)]
mod test_support;

/// Rejection of a client request. Reported only to the requesting identity.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("{0}")]
    InvalidInput(String),
    #[error("this connection is bound to a different player")]
    IdentityMismatch,
    #[error("this connection has not joined the queue or a game yet")]
    NotIdentified,
    #[error("player is already in a live match")]
    AlreadyInSession,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ProtocolViolation {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::IdentityMismatch => ErrorCode::IdentityMismatch,
            Self::NotIdentified => ErrorCode::NotIdentified,
            Self::AlreadyInSession => ErrorCode::AlreadyInSession,
            Self::Session(err) => err.error_code(),
        }
    }
}

/// Per-transport state owned by the connection task.
#[derive(Debug)]
pub struct ClientConnection {
    pub connection_id: ConnectionId,
    sender: mpsc::Sender<Arc<ServerMessage>>,
    cancel: CancellationToken,
    player_id: Option<PlayerId>,
}

impl ClientConnection {
    pub fn new(sender: mpsc::Sender<Arc<ServerMessage>>, cancel: CancellationToken) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            sender,
            cancel,
            player_id: None,
        }
    }

    /// Identity bound to this transport, once it has sent `join_queue` or `join_game`.
    pub fn player_id(&self) -> Option<&PlayerId> {
        self.player_id.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Duel server: owns every process-wide store and routes client events to them.
pub struct DuelServer {
    config: Arc<Config>,
    registry: Arc<ConnectionRegistry>,
    coordinator: Arc<dyn MessageCoordinator>,
    queue: MatchmakingQueue,
    sessions: Arc<SessionStore>,
    judge: Arc<dyn Judge>,
    catalog: Arc<dyn QuestionCatalog>,
    session_ctx: SessionContext,
    pub(crate) metrics: Arc<ServerMetrics>,
    instance_id: Uuid,
    shutdown: CancellationToken,
}

impl DuelServer {
    /// Build a server whose judge and catalog come from `config`.
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let judge = judge::from_config(&config.judge)?;
        let catalog: Arc<dyn QuestionCatalog> =
            Arc::new(InMemoryQuestionCatalog::from_config(&config.catalog));
        Ok(Self::with_collaborators(config, judge, catalog))
    }

    pub fn with_collaborators(
        config: Config,
        judge: Arc<dyn Judge>,
        catalog: Arc<dyn QuestionCatalog>,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(metrics.clone()));
        let coordinator: Arc<dyn MessageCoordinator> = registry.clone();
        let sessions = Arc::new(SessionStore::new(config.server.finished_session_retention));
        let session_ctx = SessionContext {
            policy: SessionPolicy::from_config(&config),
            coordinator: coordinator.clone(),
            metrics: metrics.clone(),
            outcomes: sessions.outcomes(),
        };
        let instance_id = Uuid::new_v4();
        tracing::info!(%instance_id, "Duel server initialized");

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            coordinator,
            queue: MatchmakingQueue::new(),
            sessions,
            judge,
            catalog,
            session_ctx,
            metrics,
            instance_id,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, player_id: &str) -> bool {
        self.queue.contains(player_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        self.registry.is_connected(player_id)
    }

    pub async fn health_check(&self) -> bool {
        !self.shutdown.is_cancelled()
    }
}
