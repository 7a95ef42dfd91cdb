// Protocol module: wire events, shared types, error codes and input validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{
    CancelReason, ConnectionId, Difficulty, EndReason, InstantReason, PlayerId, PlayerProfile,
    PlayerSummary, QuestionRef, SessionId, SessionState, Verdict,
};

pub use messages::{
    ClientMessage, GameCompletedPayload, GameJoinedPayload, MatchFoundPayload, ServerMessage,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn client_events_use_canonical_names() {
        let session_id = Uuid::new_v4();
        let json = serde_json::to_value(ClientMessage::SendEmoji {
            session_id,
            emoji: "🔥".to_string(),
            sender: "alice".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "send-emoji");
        assert_eq!(json["data"]["sender"], "alice");

        let json = serde_json::to_value(ClientMessage::InstantCodeUpdate {
            session_id,
            player_id: "alice".to_string(),
            code: "x = 1".to_string(),
            language: "python".to_string(),
            reason: InstantReason::TimerStarted,
        })
        .unwrap();
        assert_eq!(json["type"], "instant_code_update");
        assert_eq!(json["data"]["reason"], "timer_started");
    }

    #[test]
    fn unit_client_events_parse_without_data() {
        let parsed: ClientMessage = serde_json::from_str(r#"{"type":"leave_queue"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::LeaveQueue));
        let parsed: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Ping));
    }

    #[test]
    fn join_queue_parses_minimal_profile() {
        let raw = r#"{
            "type": "join_queue",
            "data": {
                "player": {"id": "u1", "name": "Ada"},
                "difficulties": ["medium", "easy"]
            }
        }"#;
        let parsed: ClientMessage = serde_json::from_str(raw).unwrap();
        match parsed {
            ClientMessage::JoinQueue {
                player,
                difficulties,
            } => {
                assert_eq!(player.id, "u1");
                assert!(!player.anonymous);
                assert!(player.ratings.is_empty());
                assert_eq!(difficulties, vec![Difficulty::Medium, Difficulty::Easy]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_instant_reason_falls_back_to_unspecified() {
        let raw = format!(
            r#"{{"type":"instant_code_update","data":{{"session_id":"{}","player_id":"a","code":"","language":"python","reason":"pasted"}}}}"#,
            Uuid::new_v4()
        );
        let parsed: ClientMessage = serde_json::from_str(&raw).unwrap();
        match parsed {
            ClientMessage::InstantCodeUpdate { reason, .. } => {
                assert_eq!(reason, InstantReason::Unspecified);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn game_start_serializes_start_time_as_epoch_millis() {
        let start_time = chrono::DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let json = serde_json::to_value(ServerMessage::GameStart {
            session_id: Uuid::nil(),
            start_time,
        })
        .unwrap();
        assert_eq!(json["type"], "game_start");
        assert_eq!(json["data"]["start_time"], 1_700_000_000_123_i64);
    }

    #[test]
    fn game_completed_omits_absent_loser_verdict() {
        let payload = GameCompletedPayload {
            session_id: Uuid::nil(),
            message: "Ada won!".to_string(),
            winner_id: "a".to_string(),
            winner_name: "Ada".to_string(),
            loser_id: "b".to_string(),
            loser_name: "Bob".to_string(),
            winner_verdict: None,
            loser_verdict: None,
            end_reason: EndReason::Disconnection,
            ended_at: chrono::Utc::now(),
            rating_gain: 20,
            rating_loss: 15,
        };
        let json = serde_json::to_value(ServerMessage::GameCompleted(Box::new(payload))).unwrap();
        assert_eq!(json["type"], "game_completed");
        assert_eq!(json["data"]["end_reason"], "disconnection");
        assert!(json["data"].get("loser_verdict").is_none());
    }

    #[test]
    fn asserted_identity_covers_identity_bearing_events() {
        let session_id = Uuid::new_v4();
        let leave = ClientMessage::LeaveGame {
            session_id,
            player_id: "p".to_string(),
        };
        assert_eq!(leave.asserted_identity(), Some("p"));
        assert!(!leave.binds_identity());
        assert_eq!(ClientMessage::Ping.asserted_identity(), None);

        let join = ClientMessage::JoinGame {
            session_id,
            player_id: "p".to_string(),
        };
        assert!(join.binds_identity());
    }

    proptest! {
        #[test]
        fn code_updates_survive_the_wire(code in ".{0,256}", language in "[a-z]{1,10}") {
            let message = ClientMessage::CodeUpdate {
                session_id: Uuid::nil(),
                player_id: "p".to_string(),
                code: code.clone(),
                language: language.clone(),
            };
            let json = serde_json::to_string(&message).unwrap();
            let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
            match parsed {
                ClientMessage::CodeUpdate { code: c, language: l, .. } => {
                    prop_assert_eq!(c, code);
                    prop_assert_eq!(l, language);
                }
                _ => prop_assert!(false, "wrong variant"),
            }
        }
    }
}
