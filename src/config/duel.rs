//! Duel timing and rating policy.

use super::defaults::{
    default_instant_window_secs, default_rated_forfeit_min_elapsed_secs, default_rating_gain,
    default_rating_loss, default_reaction_cooldown_ms, default_reaction_display_ms,
    default_reaction_fade_after_ms, default_relay_cadence_ms,
};
use serde::{Deserialize, Serialize};

/// Policy knobs for code relay, reactions and outcomes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DuelConfig {
    /// Delay between a throttled code update and its relay to the opponent (milliseconds)
    #[serde(default = "default_relay_cadence_ms")]
    pub relay_cadence_ms: u64,
    /// Window after match start during which `language_switched` instant relays are honored (seconds)
    #[serde(default = "default_instant_window_secs")]
    pub instant_window_secs: u64,
    /// Minimum spacing between accepted reactions from one sender (milliseconds)
    #[serde(default = "default_reaction_cooldown_ms")]
    pub reaction_cooldown_ms: u64,
    /// Total display lifetime of a reaction on the receiving side (milliseconds)
    #[serde(default = "default_reaction_display_ms")]
    pub reaction_display_ms: u64,
    /// Offset at which the reaction begins to fade (milliseconds)
    #[serde(default = "default_reaction_fade_after_ms")]
    pub reaction_fade_after_ms: u64,
    /// Rating awarded to the winner
    #[serde(default = "default_rating_gain")]
    pub rating_gain: i64,
    /// Rating removed from the loser
    #[serde(default = "default_rating_loss")]
    pub rating_loss: i64,
    /// Forfeits earlier than this (with nobody finished) carry no rating change (seconds)
    #[serde(default = "default_rated_forfeit_min_elapsed_secs")]
    pub rated_forfeit_min_elapsed_secs: u64,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            relay_cadence_ms: default_relay_cadence_ms(),
            instant_window_secs: default_instant_window_secs(),
            reaction_cooldown_ms: default_reaction_cooldown_ms(),
            reaction_display_ms: default_reaction_display_ms(),
            reaction_fade_after_ms: default_reaction_fade_after_ms(),
            rating_gain: default_rating_gain(),
            rating_loss: default_rating_loss(),
            rated_forfeit_min_elapsed_secs: default_rated_forfeit_min_elapsed_secs(),
        }
    }
}
