use crate::config::ProtocolConfig;

use super::types::{Difficulty, PlayerProfile};

pub fn validate_player_id_with_config(id: &str, config: &ProtocolConfig) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("Player id cannot be empty".to_string());
    }
    if id.len() > config.max_player_id_length {
        return Err(format!(
            "Player id too long (max {} bytes)",
            config.max_player_id_length
        ));
    }
    if id.chars().any(char::is_control) {
        return Err("Player id contains control characters".to_string());
    }
    Ok(())
}

pub fn validate_player_name_with_config(name: &str, config: &ProtocolConfig) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Player name cannot be blank".to_string());
    }
    if name.chars().count() > config.max_player_name_length {
        return Err(format!(
            "Player name too long (max {} characters)",
            config.max_player_name_length
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("Player name cannot contain control characters".to_string());
    }
    Ok(())
}

pub fn validate_profile_with_config(
    profile: &PlayerProfile,
    config: &ProtocolConfig,
) -> Result<(), String> {
    validate_player_id_with_config(&profile.id, config)?;
    validate_player_name_with_config(&profile.name, config)?;
    if let Some(avatar) = &profile.avatar_url {
        if avatar.len() > config.max_avatar_url_length {
            return Err(format!(
                "Avatar reference too long (max {} bytes)",
                config.max_avatar_url_length
            ));
        }
    }
    Ok(())
}

/// Sort and deduplicate the accepted set. An empty set is rejected.
pub fn normalize_difficulties(requested: &[Difficulty]) -> Result<Vec<Difficulty>, String> {
    let mut accepted = requested.to_vec();
    accepted.sort_unstable();
    accepted.dedup();
    if accepted.is_empty() {
        return Err("At least one difficulty must be accepted".to_string());
    }
    Ok(accepted)
}

pub fn validate_code_with_config(code: &str, config: &ProtocolConfig) -> Result<(), String> {
    if code.len() > config.max_code_bytes {
        return Err(format!(
            "Code too large ({} bytes, max {} bytes)",
            code.len(),
            config.max_code_bytes
        ));
    }
    Ok(())
}

pub fn validate_emoji_with_config(emoji: &str, config: &ProtocolConfig) -> Result<(), String> {
    if emoji.trim().is_empty() {
        return Err("Emoji cannot be empty".to_string());
    }
    if emoji.chars().count() > config.max_emoji_chars {
        return Err(format!(
            "Emoji too long (max {} characters)",
            config.max_emoji_chars
        ));
    }
    Ok(())
}

pub fn validate_status_with_config(status: &str, config: &ProtocolConfig) -> Result<(), String> {
    if status.trim().is_empty() {
        return Err("Status cannot be empty".to_string());
    }
    if status.chars().count() > config.max_status_length {
        return Err(format!(
            "Status too long (max {} characters)",
            config.max_status_length
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_rules() {
        let config = ProtocolConfig::default();
        assert!(validate_player_id_with_config("user-42", &config).is_ok());
        assert!(validate_player_id_with_config("", &config).is_err());
        assert!(validate_player_id_with_config("   ", &config).is_err());
        assert!(validate_player_id_with_config("a\u{0}b", &config).is_err());
        let long = "x".repeat(config.max_player_id_length + 1);
        assert!(validate_player_id_with_config(&long, &config).is_err());
    }

    #[test]
    fn player_name_counts_characters_not_bytes() {
        let config = ProtocolConfig {
            max_player_name_length: 4,
            ..ProtocolConfig::default()
        };
        assert!(validate_player_name_with_config("玩家玩家", &config).is_ok());
        assert!(validate_player_name_with_config("玩家玩家玩", &config).is_err());
        assert!(validate_player_name_with_config("  ", &config).is_err());
    }

    #[test]
    fn difficulties_are_sorted_and_deduplicated() {
        let normalized = normalize_difficulties(&[
            Difficulty::Hard,
            Difficulty::Easy,
            Difficulty::Hard,
        ])
        .unwrap();
        assert_eq!(normalized, vec![Difficulty::Easy, Difficulty::Hard]);
        assert!(normalize_difficulties(&[]).is_err());
    }

    #[test]
    fn code_and_emoji_limits() {
        let config = ProtocolConfig {
            max_code_bytes: 8,
            max_emoji_chars: 2,
            ..ProtocolConfig::default()
        };
        assert!(validate_code_with_config("print(1)", &config).is_ok());
        assert!(validate_code_with_config("print(12)", &config).is_err());
        assert!(validate_emoji_with_config("🔥", &config).is_ok());
        assert!(validate_emoji_with_config("🔥🔥🔥", &config).is_err());
        assert!(validate_emoji_with_config("", &config).is_err());
    }
}
