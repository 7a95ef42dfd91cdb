//! Judge collaborator configuration.

use super::defaults::default_judge_timeout_secs;
use serde::{Deserialize, Serialize};

/// Where and how to reach the code execution service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JudgeConfig {
    /// Base URL of the judge service; submissions fail with a judge-unavailable verdict when unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout (seconds)
    #[serde(default = "default_judge_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_judge_timeout_secs(),
        }
    }
}
