//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system. Functions are organized by category for
//! easier maintenance.

use super::catalog::QuestionConfig;
use super::logging::LogFormat;
use crate::protocol::Difficulty;
use std::collections::BTreeMap;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3737
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_join_timeout_secs() -> u64 {
    60
}

pub const fn default_disconnect_grace_secs() -> u64 {
    30
}

pub const fn default_maintenance_interval_secs() -> u64 {
    5
}

pub const fn default_finished_session_retention() -> usize {
    1024
}

pub const fn default_drain_timeout_secs() -> u64 {
    10
}

pub const fn default_session_command_capacity() -> usize {
    256
}

// =============================================================================
// Duel Defaults
// =============================================================================

pub const fn default_relay_cadence_ms() -> u64 {
    30_000
}

pub const fn default_instant_window_secs() -> u64 {
    30
}

pub const fn default_reaction_cooldown_ms() -> u64 {
    500
}

pub const fn default_reaction_display_ms() -> u64 {
    4_000
}

pub const fn default_reaction_fade_after_ms() -> u64 {
    3_500
}

pub const fn default_rating_gain() -> i64 {
    20
}

pub const fn default_rating_loss() -> i64 {
    15
}

pub const fn default_rated_forfeit_min_elapsed_secs() -> u64 {
    120
}

// =============================================================================
// Matchmaking Defaults
// =============================================================================

pub const fn default_sweep_interval_ms() -> u64 {
    1_000
}

pub fn default_difficulty_priority() -> Vec<Difficulty> {
    Difficulty::ALL.to_vec()
}

// =============================================================================
// Judge Defaults
// =============================================================================

pub const fn default_judge_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_max_player_id_length() -> usize {
    128
}

pub const fn default_max_player_name_length() -> usize {
    32
}

pub const fn default_max_avatar_url_length() -> usize {
    2048
}

pub const fn default_max_code_bytes() -> usize {
    65_536
}

pub const fn default_max_emoji_chars() -> usize {
    8
}

pub const fn default_max_status_length() -> usize {
    64
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "codeduel.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

pub const fn default_max_message_size() -> usize {
    131_072 // 128KB, room for a full code payload plus envelope
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

pub const fn default_idle_timeout_secs() -> u64 {
    120
}

pub const fn default_ping_interval_secs() -> u64 {
    30
}

// =============================================================================
// Catalog Defaults
// =============================================================================

fn starter(python: &str, javascript: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("python".to_string(), python.to_string()),
        ("javascript".to_string(), javascript.to_string()),
    ])
}

fn question(
    slug: &str,
    title: &str,
    difficulty: Difficulty,
    starter_code: BTreeMap<String, String>,
) -> QuestionConfig {
    QuestionConfig {
        slug: slug.to_string(),
        title: title.to_string(),
        difficulty,
        languages: starter_code.keys().cloned().collect(),
        starter_code,
    }
}

/// Small built-in question set so a bare deployment can run matches.
pub fn default_questions() -> Vec<QuestionConfig> {
    vec![
        question(
            "two-sum",
            "Two Sum",
            Difficulty::Easy,
            starter(
                "class Solution:\n    def twoSum(self, nums: List[int], target: int) -> List[int]:\n        pass\n",
                "var twoSum = function(nums, target) {\n\n};\n",
            ),
        ),
        question(
            "valid-parentheses",
            "Valid Parentheses",
            Difficulty::Easy,
            starter(
                "class Solution:\n    def isValid(self, s: str) -> bool:\n        pass\n",
                "var isValid = function(s) {\n\n};\n",
            ),
        ),
        question(
            "group-anagrams",
            "Group Anagrams",
            Difficulty::Medium,
            starter(
                "class Solution:\n    def groupAnagrams(self, strs: List[str]) -> List[List[str]]:\n        pass\n",
                "var groupAnagrams = function(strs) {\n\n};\n",
            ),
        ),
        question(
            "coin-change",
            "Coin Change",
            Difficulty::Medium,
            starter(
                "class Solution:\n    def coinChange(self, coins: List[int], amount: int) -> int:\n        pass\n",
                "var coinChange = function(coins, amount) {\n\n};\n",
            ),
        ),
        question(
            "trapping-rain-water",
            "Trapping Rain Water",
            Difficulty::Hard,
            starter(
                "class Solution:\n    def trap(self, height: List[int]) -> int:\n        pass\n",
                "var trap = function(height) {\n\n};\n",
            ),
        ),
        question(
            "burst-balloons",
            "Burst Balloons",
            Difficulty::Hard,
            starter(
                "class Solution:\n    def maxCoins(self, nums: List[int]) -> int:\n        pass\n",
                "var maxCoins = function(nums) {\n\n};\n",
            ),
        ),
    ]
}
