//! Domain models for gatekeeper decisions and calibration reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actual-vs-threshold evidence for one evaluated gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvidence {
    /// Gate name (e.g. "determinism", "f1").
    pub gate: String,
    /// Observed value.
    pub actual: f64,
    /// Configured threshold.
    pub threshold: f64,
    /// Whether the gate passed.
    pub passed: bool,
}

/// Immutable, auditable outcome of one gatekeeper evaluation.
///
/// `reasoning` holds exactly one line per evaluated gate, in evaluation
/// order, so its length always equals the number of gates run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatekeeperDecision {
    /// Unique decision id.
    pub id: Uuid,

    /// Operation the candidate refers to (tool_name:input_hash).
    pub operation_id: String,

    /// Whether every evaluated gate passed.
    pub approved: bool,

    /// One human-readable line per evaluated gate.
    pub reasoning: Vec<String>,

    /// Actual + threshold per evaluated gate.
    pub evidence: Vec<GateEvidence>,

    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

/// External benchmark report consumed when calibration gates are active.
///
/// Confusion-matrix counts refer to a reference corpus the promoted
/// automation was replayed against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Precision over the reference corpus.
    pub precision: f64,
    /// Recall over the reference corpus.
    pub recall: f64,
    /// F1 score.
    pub f1: f64,
    /// Accuracy.
    pub accuracy: f64,
    /// True positives.
    pub true_positives: u64,
    /// False positives.
    pub false_positives: u64,
    /// True negatives.
    pub true_negatives: u64,
    /// False negatives.
    pub false_negatives: u64,
}
