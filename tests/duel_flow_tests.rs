mod test_helpers;

use codeduel_server::protocol::*;
use test_helpers::{create_test_server, start_duel, TestClient, PASSING_CODE};
use tokio::time::Duration;

fn code_update(session_id: SessionId, player: &str, code: &str, language: &str) -> ClientMessage {
    ClientMessage::CodeUpdate {
        session_id,
        player_id: player.to_string(),
        code: code.to_string(),
        language: language.to_string(),
    }
}

fn submit(session_id: SessionId, player: &str, code: &str) -> ClientMessage {
    ClientMessage::SubmitSolution {
        session_id,
        player_id: player.to_string(),
        code: code.to_string(),
        language: "python".to_string(),
        elapsed_ms: None,
    }
}

#[tokio::test(start_paused = true)]
async fn both_players_receive_the_same_start_time() {
    let server = create_test_server();
    let mut alice = TestClient::connect(&server);
    let mut bob = TestClient::connect(&server);
    alice.join_queue("alice", &[Difficulty::Easy]).await;
    bob.join_queue("bob", &[Difficulty::Easy]).await;
    let session_id = alice.expect_match().await;
    bob.expect_match().await;

    alice.join_game("alice", session_id).await;
    match &*alice.next_named("game_joined").await {
        ServerMessage::GameJoined(payload) => {
            assert!(payload.start_time.is_none());
            assert!(payload.starter_code.contains_key("python"));
        }
        other => panic!("unexpected message {other:?}"),
    }
    bob.join_game("bob", session_id).await;

    let start_of = |message: &ServerMessage| match message {
        ServerMessage::GameStart { start_time, .. } => *start_time,
        other => panic!("unexpected message {other:?}"),
    };
    let alice_start = start_of(&*alice.next_named("game_start").await);
    let bob_start = start_of(&*bob.next_named("game_start").await);
    assert_eq!(alice_start, bob_start);
}

#[tokio::test(start_paused = true)]
async fn keystroke_updates_are_coalesced_into_one_relay() {
    let server = create_test_server();
    let (mut alice, mut bob, session_id) = start_duel(&server).await;

    alice.send(code_update(session_id, "alice", "a", "python")).await;
    alice.send(code_update(session_id, "alice", "ab", "python")).await;
    alice.send(code_update(session_id, "alice", "abc", "python")).await;

    let notices = bob
        .drain()
        .iter()
        .filter(|m| m.event_name() == "player_code_updated")
        .count();
    assert_eq!(notices, 3);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let relays: Vec<_> = bob
        .drain()
        .into_iter()
        .filter(|m| m.event_name() == "opponent_code_ready")
        .collect();
    assert_eq!(relays.len(), 1);
    match &*relays[0] {
        ServerMessage::OpponentCodeReady { code, instant, .. } => {
            assert_eq!(code, "abc");
            assert!(!instant);
        }
        other => panic!("unexpected message {other:?}"),
    }
    assert!(alice
        .drain()
        .iter()
        .all(|m| m.event_name() != "opponent_code_ready"));
}

#[tokio::test(start_paused = true)]
async fn first_passing_submission_wins() {
    let server = create_test_server();
    let (mut alice, mut bob, session_id) = start_duel(&server).await;

    bob.send(submit(session_id, "bob", "def solve(): return 0")).await;
    match &*bob.next_named("submission_result").await {
        ServerMessage::SubmissionResult { verdict, .. } => assert!(!verdict.success),
        other => panic!("unexpected message {other:?}"),
    }
    alice.next_named("opponent_submitted").await;

    alice.send(submit(session_id, "alice", PASSING_CODE)).await;
    let outcome = match &*bob.next_named("game_completed").await {
        ServerMessage::GameCompleted(payload) => payload.clone(),
        other => panic!("unexpected message {other:?}"),
    };
    assert_eq!(outcome.winner_id, "alice");
    assert_eq!(outcome.end_reason, EndReason::Solved);
    assert_eq!(outcome.message, "alice solved it first!");
    assert!(outcome.winner_verdict.as_ref().is_some_and(|v| v.success));
    assert!(outcome.loser_verdict.as_ref().is_some_and(|v| !v.success));
    alice.next_named("game_completed").await;

    // A late submission from the loser cannot change the result.
    bob.send(submit(session_id, "bob", PASSING_CODE)).await;
    let code = bob.expect_error().await;
    assert!(matches!(
        code,
        ErrorCode::SessionNotFound | ErrorCode::InvalidSessionState
    ));
}

#[tokio::test(start_paused = true)]
async fn disconnect_past_grace_forfeits_the_match() {
    let server = create_test_server();
    let (mut alice, bob, _session_id) = start_duel(&server).await;

    bob.close().await;
    match &*alice.next_named("opponent_disconnected").await {
        ServerMessage::OpponentDisconnected { player_id, grace_ms } => {
            assert_eq!(player_id, "bob");
            assert_eq!(*grace_ms, 5_000);
        }
        other => panic!("unexpected message {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    match &*alice.next_named("game_completed").await {
        ServerMessage::GameCompleted(payload) => {
            assert_eq!(payload.winner_id, "alice");
            assert_eq!(payload.loser_id, "bob");
            assert_eq!(payload.end_reason, EndReason::Disconnection);
            // Too early in the match for the forfeit to be rated.
            assert_eq!(payload.rating_gain, 0);
            assert_eq!(payload.rating_loss, 0);
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn rejoin_within_grace_keeps_the_match_alive() {
    let server = create_test_server();
    let (mut alice, mut bob, session_id) = start_duel(&server).await;

    bob.send(code_update(session_id, "bob", "x = 1", "python")).await;
    bob.close().await;
    alice.next_named("opponent_disconnected").await;
    let mut bob = TestClient::connect(&server);

    tokio::time::sleep(Duration::from_secs(2)).await;
    bob.join_game("bob", session_id).await;
    alice.next_named("opponent_reconnected").await;
    match &*bob.next_named("game_joined").await {
        ServerMessage::GameJoined(payload) => {
            assert!(payload.start_time.is_some());
            assert_eq!(payload.your_code.get("python").map(String::as_str), Some("x = 1"));
        }
        other => panic!("unexpected message {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(alice
        .drain()
        .iter()
        .all(|m| m.event_name() != "game_completed"));
    assert!(server.sessions().get(&session_id).is_some());
}

#[tokio::test(start_paused = true)]
async fn unjoined_match_is_cancelled_after_the_join_timeout() {
    let server = create_test_server();
    let mut alice = TestClient::connect(&server);
    let mut bob = TestClient::connect(&server);
    alice.join_queue("alice", &[Difficulty::Easy]).await;
    bob.join_queue("bob", &[Difficulty::Easy]).await;
    let session_id = alice.expect_match().await;
    bob.expect_match().await;
    alice.join_game("alice", session_id).await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    for client in [&mut alice, &mut bob] {
        match &*client.next_named("match_cancelled").await {
            ServerMessage::MatchCancelled { reason, .. } => {
                assert_eq!(*reason, CancelReason::JoinTimeout);
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(client.expect_error().await, ErrorCode::JoinTimeout);
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(server.sessions().get(&session_id).is_none());

    // Both may queue again.
    alice.join_queue("alice", &[Difficulty::Easy]).await;
    alice.next_named("queue_joined").await;
}

#[tokio::test(start_paused = true)]
async fn reactions_reach_only_the_opponent() {
    let server = create_test_server();
    let (mut alice, mut bob, session_id) = start_duel(&server).await;

    alice
        .send(ClientMessage::SendEmoji {
            session_id,
            emoji: "🎉".to_string(),
            sender: "alice".to_string(),
        })
        .await;

    match &*bob.next_named("emoji_received").await {
        ServerMessage::EmojiReceived {
            emoji,
            from,
            display_ms,
            fade_after_ms,
            ..
        } => {
            assert_eq!(emoji, "🎉");
            assert_eq!(from, "alice");
            assert!(fade_after_ms < display_ms);
        }
        other => panic!("unexpected message {other:?}"),
    }
    assert!(alice
        .drain()
        .iter()
        .all(|m| m.event_name() != "emoji_received"));
}
