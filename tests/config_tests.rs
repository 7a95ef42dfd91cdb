use codeduel_server::config::{self, Config};
use codeduel_server::protocol::Difficulty;
use serial_test::serial;
use std::io::Write;

const ENV_VARS: &[&str] = &[
    "CODEDUEL_CONFIG_PATH",
    "CODEDUEL_CONFIG_JSON",
    "CODEDUEL__PORT",
    "CODEDUEL__DUEL__RELAY_CADENCE_MS",
    "CODEDUEL__MATCHMAKING__DIFFICULTY_PRIORITY",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_config_roundtrip_serialization() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).expect("serialization should succeed");
    let deserialized: Config = serde_json::from_str(&json).expect("deserialization should succeed");

    assert_eq!(config.port, deserialized.port);
    assert_eq!(config.duel.relay_cadence_ms, deserialized.duel.relay_cadence_ms);
    assert_eq!(
        config.catalog.questions.len(),
        deserialized.catalog.questions.len()
    );
}

#[test]
fn test_default_config_is_valid() {
    config::validate_config(&Config::default()).expect("defaults should validate");
}

#[test]
fn test_validation_rejects_fade_after_display() {
    let mut config = Config::default();
    config.duel.reaction_fade_after_ms = config.duel.reaction_display_ms;
    assert!(config::validate_config(&config).is_err());
}

#[test]
fn test_validation_rejects_incomplete_priority() {
    let mut config = Config::default();
    config.matchmaking.difficulty_priority = vec![Difficulty::Hard, Difficulty::Easy];
    assert!(config::validate_config(&config).is_err());
}

#[test]
fn test_validation_rejects_bad_judge_url() {
    let mut config = Config::default();
    config.judge.base_url = Some("ftp://judge.internal".to_string());
    assert!(config::validate_config(&config).is_err());
}

#[test]
#[serial]
fn test_load_reads_file_from_config_path() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"port": 4100, "duel": {{"relay_cadence_ms": 5000}}, "server": {{"disconnect_grace_secs": 12}}}}"#
    )
    .unwrap();
    std::env::set_var("CODEDUEL_CONFIG_PATH", file.path());

    let config = config::load();
    clear_env();

    assert_eq!(config.port, 4100);
    assert_eq!(config.duel.relay_cadence_ms, 5000);
    assert_eq!(config.server.disconnect_grace_secs, 12);
    assert_eq!(config.duel.reaction_cooldown_ms, 500);
}

#[test]
#[serial]
fn test_env_overrides_win_over_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{"port": 4100}}"#).unwrap();
    std::env::set_var("CODEDUEL_CONFIG_PATH", file.path());
    std::env::set_var("CODEDUEL__PORT", "4200");
    std::env::set_var("CODEDUEL__DUEL__RELAY_CADENCE_MS", "2500");
    std::env::set_var(
        "CODEDUEL__MATCHMAKING__DIFFICULTY_PRIORITY",
        "hard,medium,easy",
    );

    let config = config::load();
    clear_env();

    assert_eq!(config.port, 4200);
    assert_eq!(config.duel.relay_cadence_ms, 2500);
    assert_eq!(
        config.matchmaking.difficulty_priority,
        vec![Difficulty::Hard, Difficulty::Medium, Difficulty::Easy]
    );
}

#[test]
#[serial]
fn test_inline_json_overrides_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{"port": 4100}}"#).unwrap();
    std::env::set_var("CODEDUEL_CONFIG_PATH", file.path());
    std::env::set_var("CODEDUEL_CONFIG_JSON", r#"{"port": 4300}"#);

    let config = config::load();
    clear_env();

    assert_eq!(config.port, 4300);
}

#[test]
#[serial]
fn test_unparseable_file_falls_back_to_defaults() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "port = 4100").unwrap();
    std::env::set_var("CODEDUEL_CONFIG_PATH", file.path());

    let config = config::load();
    clear_env();

    assert_eq!(config.port, Config::default().port);
}
