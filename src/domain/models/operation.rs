//! Domain models for classified operations and promotion candidates.

use serde::{Deserialize, Serialize};

/// Determinism boundary above which an operation is fully deterministic.
pub const DETERMINISTIC_THRESHOLD: f64 = 0.95;

/// Determinism boundary above which an operation is semi-deterministic.
pub const SEMI_DETERMINISTIC_THRESHOLD: f64 = 0.70;

/// Reproducibility class of a (tool, input) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismClass {
    /// Determinism >= 0.95.
    Deterministic,
    /// Determinism >= 0.70.
    SemiDeterministic,
    /// Everything below.
    NonDeterministic,
}

impl DeterminismClass {
    /// Classifies a determinism score at the fixed boundaries.
    pub fn from_score(determinism: f64) -> Self {
        if determinism >= DETERMINISTIC_THRESHOLD {
            Self::Deterministic
        } else if determinism >= SEMI_DETERMINISTIC_THRESHOLD {
            Self::SemiDeterministic
        } else {
            Self::NonDeterministic
        }
    }
}

/// Aggregated reproducibility statistics for one logical operation,
/// keyed by (tool name, hash of normalized input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedOperation {
    /// Tool name.
    pub tool_name: String,

    /// SHA-256 hex digest of the canonicalized input.
    pub input_hash: String,

    /// Number of observed executions with an output.
    pub observation_count: u64,

    /// Distinct output hashes seen.
    pub unique_outputs: u64,

    /// Fraction of non-dominant outputs, normalized to [0, 1].
    pub variance_score: f64,

    /// 1 - variance_score.
    pub determinism: f64,

    /// Classification at the 0.95 / 0.70 boundaries.
    pub classification: DeterminismClass,
}

impl ClassifiedOperation {
    /// Stable identifier for this operation, used across stores.
    pub fn operation_id(&self) -> String {
        format!("{}:{}", self.tool_name, self.input_hash)
    }
}

/// A ranked candidate for promotion to standalone automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCandidate {
    /// The underlying classified operation.
    pub operation: ClassifiedOperation,

    /// Tool name (mirrors the operation for convenient access).
    pub tool_name: String,

    /// Observation count.
    pub frequency: u64,

    /// Estimated tokens saved per promoted execution.
    pub estimated_token_savings: f64,

    /// Bounded desirability score in [0, 1].
    pub composite_score: f64,

    /// Whether the composite score clears the confidence threshold.
    pub meets_confidence: bool,
}

impl PromotionCandidate {
    /// Stable identifier, shared with the underlying operation.
    pub fn operation_id(&self) -> String {
        self.operation.operation_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(
            DeterminismClass::from_score(0.95),
            DeterminismClass::Deterministic
        );
        assert_eq!(
            DeterminismClass::from_score(0.949),
            DeterminismClass::SemiDeterministic
        );
        assert_eq!(
            DeterminismClass::from_score(0.70),
            DeterminismClass::SemiDeterministic
        );
        assert_eq!(
            DeterminismClass::from_score(0.699),
            DeterminismClass::NonDeterministic
        );
        assert_eq!(
            DeterminismClass::from_score(1.0),
            DeterminismClass::Deterministic
        );
    }

    #[test]
    fn test_operation_id_format() {
        let op = ClassifiedOperation {
            tool_name: "Bash".to_string(),
            input_hash: "abc123".to_string(),
            observation_count: 5,
            unique_outputs: 1,
            variance_score: 0.0,
            determinism: 1.0,
            classification: DeterminismClass::Deterministic,
        };
        assert_eq!(op.operation_id(), "Bash:abc123");
    }
}
