//! Configuration validation functions.

use super::Config;
use crate::protocol::Difficulty;
use std::collections::HashSet;

/// Reject configurations the server cannot run with.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let duel = &config.duel;
    if duel.relay_cadence_ms == 0 {
        anyhow::bail!("duel.relay_cadence_ms must be greater than zero");
    }
    if duel.reaction_fade_after_ms >= duel.reaction_display_ms {
        anyhow::bail!(
            "duel.reaction_fade_after_ms ({}) must be lower than duel.reaction_display_ms ({})",
            duel.reaction_fade_after_ms,
            duel.reaction_display_ms
        );
    }
    if duel.rating_gain < 0 || duel.rating_loss < 0 {
        anyhow::bail!("duel.rating_gain and duel.rating_loss must not be negative");
    }

    let server = &config.server;
    if server.join_timeout_secs == 0 {
        anyhow::bail!("server.join_timeout_secs must be greater than zero");
    }
    if server.maintenance_interval_secs == 0 {
        anyhow::bail!("server.maintenance_interval_secs must be greater than zero");
    }
    if server.session_command_capacity == 0 {
        anyhow::bail!("server.session_command_capacity must be at least 1");
    }

    validate_matchmaking(config)?;
    validate_catalog(config)?;

    if let Some(base_url) = config.judge.base_url.as_deref() {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("judge.base_url '{base_url}' is not a valid URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("judge.base_url must use http or https (got '{}')", parsed.scheme());
        }
    }
    if config.judge.timeout_secs == 0 {
        anyhow::bail!("judge.timeout_secs must be greater than zero");
    }

    if config.security.max_message_size <= config.protocol.max_code_bytes {
        anyhow::bail!(
            "security.max_message_size ({}) must exceed protocol.max_code_bytes ({}) to leave room for the envelope",
            config.security.max_message_size,
            config.protocol.max_code_bytes
        );
    }

    config.websocket.validate()?;

    Ok(())
}

fn validate_matchmaking(config: &Config) -> anyhow::Result<()> {
    let priority = &config.matchmaking.difficulty_priority;
    let unique: HashSet<Difficulty> = priority.iter().copied().collect();
    if unique.len() != priority.len() {
        anyhow::bail!("matchmaking.difficulty_priority must not repeat a difficulty");
    }
    if unique.len() != Difficulty::ALL.len() {
        anyhow::bail!("matchmaking.difficulty_priority must list easy, medium and hard");
    }
    if config.matchmaking.sweep_interval_ms == 0 {
        anyhow::bail!("matchmaking.sweep_interval_ms must be greater than zero");
    }
    Ok(())
}

fn validate_catalog(config: &Config) -> anyhow::Result<()> {
    let mut slugs = HashSet::new();
    for question in &config.catalog.questions {
        if !slugs.insert(question.slug.as_str()) {
            anyhow::bail!("catalog question slug '{}' is duplicated", question.slug);
        }
        if question.languages.is_empty() {
            anyhow::bail!("catalog question '{}' lists no languages", question.slug);
        }
        if let Some(language) = question
            .starter_code
            .keys()
            .find(|language| !question.languages.contains(language))
        {
            anyhow::bail!(
                "catalog question '{}' has starter code for unsupported language '{language}'",
                question.slug
            );
        }
    }

    for difficulty in &config.matchmaking.difficulty_priority {
        if !config
            .catalog
            .questions
            .iter()
            .any(|question| question.difficulty == *difficulty)
        {
            anyhow::bail!("catalog has no {difficulty} question");
        }
    }
    Ok(())
}
