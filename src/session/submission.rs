//! Verdict stamping and display score.

use crate::judge::{JudgeError, JudgeVerdict};
use crate::protocol::Verdict;

/// Score reduction for a complexity label. Labels are compared after dropping whitespace and
/// lowercasing, so `O(n log n)` and `o(nlogn)` are the same.
pub fn complexity_reduction(complexity: Option<&str>) -> u64 {
    let Some(label) = complexity else {
        return 50;
    };
    let normalized: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    match normalized.as_str() {
        "o(1)" => 100,
        "o(logn)" => 90,
        "o(n)" => 80,
        "o(nlogn)" => 70,
        "o(n^2)" => 60,
        _ => 50,
    }
}

/// `elapsed_seconds - reduction(complexity)`, floored at zero.
pub fn score(complexity: Option<&str>, elapsed_ms: u64) -> u64 {
    (elapsed_ms / 1_000).saturating_sub(complexity_reduction(complexity))
}

/// Turn raw judge output into the verdict recorded on the session.
pub fn stamp_verdict(raw: JudgeVerdict, elapsed_ms: u64) -> Verdict {
    let score = score(raw.complexity.as_deref(), elapsed_ms);
    Verdict {
        success: raw.success,
        total_passed: raw.total_passed,
        total_failed: raw.total_failed,
        complexity: raw.complexity,
        elapsed_ms,
        score,
        error: raw.error,
    }
}

/// A judge failure is a failed verdict carrying the failure detail.
pub fn failed_verdict(err: &JudgeError, elapsed_ms: u64) -> Verdict {
    Verdict {
        success: false,
        total_passed: 0,
        total_failed: 0,
        complexity: None,
        elapsed_ms,
        score: 0,
        error: Some(err.to_string()),
    }
}
