use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use super::{ClientConnection, DuelServer};
use crate::catalog::InMemoryQuestionCatalog;
use crate::config::Config;
use crate::judge::{Judge, JudgeError, JudgeRequest, JudgeVerdict};
use crate::protocol::{ClientMessage, Difficulty, PlayerProfile, ServerMessage, SessionId};

/// Judge whose next verdict is set by the test.
#[derive(Default)]
pub(crate) struct ScriptedJudge {
    verdict: Mutex<Option<JudgeVerdict>>,
}

impl ScriptedJudge {
    pub fn set(&self, verdict: Option<JudgeVerdict>) {
        *self.verdict.lock().unwrap() = verdict;
    }

    fn next(&self) -> Result<JudgeVerdict, JudgeError> {
        self.verdict
            .lock()
            .unwrap()
            .clone()
            .ok_or(JudgeError::Unavailable)
    }
}

#[async_trait::async_trait]
impl Judge for ScriptedJudge {
    async fn run_sample(&self, _request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.next()
    }

    async fn run_all(&self, _request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.next()
    }
}

pub(crate) fn passing() -> JudgeVerdict {
    JudgeVerdict {
        success: true,
        total_passed: 3,
        total_failed: 0,
        complexity: Some("O(n)".to_string()),
        error: None,
    }
}

pub(crate) fn create_test_server_with(config: Config) -> (Arc<DuelServer>, Arc<ScriptedJudge>) {
    let judge = Arc::new(ScriptedJudge::default());
    let catalog = Arc::new(InMemoryQuestionCatalog::from_config(&config.catalog));
    let server = DuelServer::with_collaborators(config, judge.clone(), catalog);
    (server, judge)
}

pub(crate) fn create_test_server() -> (Arc<DuelServer>, Arc<ScriptedJudge>) {
    create_test_server_with(Config::default())
}

pub(crate) struct TestClient {
    pub connection: ClientConnection,
    rx: mpsc::Receiver<Arc<ServerMessage>>,
}

impl TestClient {
    pub fn connect(server: &DuelServer) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let connection = ClientConnection::new(tx, CancellationToken::new());
        server.connect(&connection);
        let mut client = Self { connection, rx };
        assert_eq!(client.try_next().map(|m| m.event_name()), Some("connected"));
        client
    }

    pub async fn send(&mut self, server: &Arc<DuelServer>, message: ClientMessage) {
        server
            .handle_client_message(&mut self.connection, message)
            .await;
    }

    pub fn try_next(&mut self) -> Option<Arc<ServerMessage>> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Arc<ServerMessage> {
        timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("transport channel closed")
    }

    /// Skip messages until one named `event` arrives.
    pub async fn next_named(&mut self, event: &str) -> Arc<ServerMessage> {
        loop {
            let message = self.next().await;
            if message.event_name() == event {
                return message;
            }
        }
    }

    pub async fn expect_error(&mut self) -> crate::protocol::ErrorCode {
        match &*self.next_named("error").await {
            ServerMessage::Error {
                error_code: Some(code),
                ..
            } => *code,
            other => panic!("unexpected message {other:?}"),
        }
    }
}

pub(crate) fn join_queue(id: &str, difficulties: &[Difficulty]) -> ClientMessage {
    ClientMessage::JoinQueue {
        player: PlayerProfile::anonymous(id),
        difficulties: difficulties.to_vec(),
    }
}

pub(crate) fn join_game(id: &str, session_id: SessionId) -> ClientMessage {
    ClientMessage::JoinGame {
        session_id,
        player_id: id.to_string(),
    }
}

/// Queue two players and return their clients plus the session they were matched into.
pub(crate) async fn matched_pair(
    server: &Arc<DuelServer>,
) -> (TestClient, TestClient, SessionId) {
    let mut alice = TestClient::connect(server);
    let mut bob = TestClient::connect(server);
    alice.send(server, join_queue("alice", &[Difficulty::Easy])).await;
    bob.send(server, join_queue("bob", &[Difficulty::Easy])).await;

    let session_id = match &*alice.next_named("match_found").await {
        ServerMessage::MatchFound(payload) => payload.session_id,
        other => panic!("unexpected message {other:?}"),
    };
    bob.next_named("match_found").await;
    (alice, bob, session_id)
}

/// Matched pair that has room-joined, so the match is running.
pub(crate) async fn running_pair(
    server: &Arc<DuelServer>,
) -> (TestClient, TestClient, SessionId) {
    let (mut alice, mut bob, session_id) = matched_pair(server).await;
    alice.send(server, join_game("alice", session_id)).await;
    bob.send(server, join_game("bob", session_id)).await;
    alice.next_named("game_start").await;
    bob.next_named("game_start").await;
    (alice, bob, session_id)
}
