//! Protocol input limits.

use super::defaults::{
    default_max_avatar_url_length, default_max_code_bytes, default_max_emoji_chars,
    default_max_player_id_length, default_max_player_name_length, default_max_status_length,
};
use serde::{Deserialize, Serialize};

/// Limits applied to client-supplied fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    #[serde(default = "default_max_player_id_length")]
    pub max_player_id_length: usize,
    /// Maximum length for player names (characters)
    #[serde(default = "default_max_player_name_length")]
    pub max_player_name_length: usize,
    #[serde(default = "default_max_avatar_url_length")]
    pub max_avatar_url_length: usize,
    /// Maximum size of one code payload (bytes)
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
    #[serde(default = "default_max_emoji_chars")]
    pub max_emoji_chars: usize,
    #[serde(default = "default_max_status_length")]
    pub max_status_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_player_id_length: default_max_player_id_length(),
            max_player_name_length: default_max_player_name_length(),
            max_avatar_url_length: default_max_avatar_url_length(),
            max_code_bytes: default_max_code_bytes(),
            max_emoji_chars: default_max_emoji_chars(),
            max_status_length: default_max_status_length(),
        }
    }
}
