//! Domain models for post-promotion drift monitoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One live-vs-expected comparison for a promoted operation.
///
/// Matches are persisted too: they are evidence the automation still
/// holds, not just the mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    /// Operation under observation (tool_name:input_hash).
    pub operation_id: String,

    /// When the comparison ran.
    pub timestamp: DateTime<Utc>,

    /// Whether the live hash matched the expected hash.
    pub matched: bool,

    /// Hash of the live output.
    pub actual_hash: String,

    /// Historical expected hash.
    pub expected_hash: String,

    /// Consecutive mismatch count after this event.
    pub consecutive_mismatches: u32,
}

/// Outcome of a drift check, including whether the operation is demoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemotionDecision {
    /// Operation under observation.
    pub operation_id: String,

    /// Whether the operation should revert to agent-level execution.
    pub demoted: bool,

    /// Consecutive mismatch count after this check.
    pub consecutive_mismatches: u32,

    /// Human-readable outcome (reset / below threshold / at threshold /
    /// monitoring disabled).
    pub reason: String,

    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}
