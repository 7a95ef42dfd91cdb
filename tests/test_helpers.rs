use async_trait::async_trait;
use codeduel_server::catalog::InMemoryQuestionCatalog;
use codeduel_server::config::Config;
use codeduel_server::judge::{Judge, JudgeError, JudgeRequest, JudgeVerdict};
use codeduel_server::protocol::{
    ClientMessage, Difficulty, ErrorCode, PlayerProfile, ServerMessage, SessionId,
};
use codeduel_server::server::{ClientConnection, DuelServer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Code containing this marker passes every test; anything else fails one.
pub const PASSING_CODE: &str = "def solve(): return 42  # passes";

/// Deterministic judge keyed on the submitted code.
pub struct MarkerJudge;

#[async_trait]
impl Judge for MarkerJudge {
    async fn run_sample(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.run_all(request).await
    }

    async fn run_all(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let success = request.code.contains("# passes");
        Ok(JudgeVerdict {
            success,
            total_passed: if success { 10 } else { 9 },
            total_failed: u32::from(!success),
            complexity: success.then(|| "O(n)".to_string()),
            error: (!success).then(|| "wrong answer on test 10".to_string()),
        })
    }
}

/// Default configuration with short timers for tests
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.duel.relay_cadence_ms = 1_000;
    config.server.disconnect_grace_secs = 5;
    config.server.join_timeout_secs = 10;
    config.duel.rated_forfeit_min_elapsed_secs = 60;
    config.logging.enable_file_logging = false;
    config
}

/// Create a test server with the marker judge and the default catalog
#[allow(dead_code)]
pub fn create_test_server() -> Arc<DuelServer> {
    create_test_server_with_config(test_config())
}

#[allow(dead_code)]
pub fn create_test_server_with_config(config: Config) -> Arc<DuelServer> {
    let catalog = Arc::new(InMemoryQuestionCatalog::from_config(&config.catalog));
    DuelServer::with_collaborators(config, Arc::new(MarkerJudge), catalog)
}

/// In-process transport: drives the server exactly like the WebSocket connection task does.
#[allow(dead_code)]
pub struct TestClient {
    pub connection: ClientConnection,
    server: Arc<DuelServer>,
    rx: mpsc::Receiver<Arc<ServerMessage>>,
}

#[allow(dead_code)]
impl TestClient {
    pub fn connect(server: &Arc<DuelServer>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let connection = ClientConnection::new(tx, CancellationToken::new());
        server.connect(&connection);
        Self {
            connection,
            server: Arc::clone(server),
            rx,
        }
    }

    pub async fn send(&mut self, message: ClientMessage) {
        self.server
            .handle_client_message(&mut self.connection, message)
            .await;
    }

    pub async fn close(&self) {
        self.server.disconnect(&self.connection).await;
    }

    pub async fn next(&mut self) -> Arc<ServerMessage> {
        tokio::time::timeout(Duration::from_secs(3), self.rx.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("transport channel closed")
    }

    pub async fn next_named(&mut self, event: &str) -> Arc<ServerMessage> {
        loop {
            let message = self.next().await;
            if message.event_name() == event {
                return message;
            }
        }
    }

    /// Every message already delivered, without waiting.
    pub fn drain(&mut self) -> Vec<Arc<ServerMessage>> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    pub async fn expect_error(&mut self) -> ErrorCode {
        match &*self.next_named("error").await {
            ServerMessage::Error {
                error_code: Some(code),
                ..
            } => *code,
            other => panic!("unexpected message {other:?}"),
        }
    }

    pub async fn join_queue(&mut self, id: &str, difficulties: &[Difficulty]) {
        self.send(ClientMessage::JoinQueue {
            player: PlayerProfile::anonymous(id),
            difficulties: difficulties.to_vec(),
        })
        .await;
    }

    pub async fn join_game(&mut self, id: &str, session_id: SessionId) {
        self.send(ClientMessage::JoinGame {
            session_id,
            player_id: id.to_string(),
        })
        .await;
    }

    pub async fn expect_match(&mut self) -> SessionId {
        match &*self.next_named("match_found").await {
            ServerMessage::MatchFound(payload) => payload.session_id,
            other => panic!("unexpected message {other:?}"),
        }
    }
}

/// Queue two players on `easy` and room-join both; returns once the match is running.
#[allow(dead_code)]
pub async fn start_duel(server: &Arc<DuelServer>) -> (TestClient, TestClient, SessionId) {
    let mut alice = TestClient::connect(server);
    let mut bob = TestClient::connect(server);
    alice.join_queue("alice", &[Difficulty::Easy]).await;
    bob.join_queue("bob", &[Difficulty::Easy]).await;
    let session_id = alice.expect_match().await;
    assert_eq!(bob.expect_match().await, session_id);

    alice.join_game("alice", session_id).await;
    bob.join_game("bob", session_id).await;
    alice.next_named("game_start").await;
    bob.next_named("game_start").await;
    (alice, bob, session_id)
}
