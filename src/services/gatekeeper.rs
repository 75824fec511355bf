//! Promotion gatekeeping: the final pass/fail authority before an
//! approved candidate is handed to script generation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    BenchmarkReport, GateEvidence, GatekeeperConfig, GatekeeperDecision, PromotionCandidate,
};
use crate::domain::ports::{RecordStore, StoreCategory};

use super::calibration::{self, ConfusionMatrix};

/// Applies configured thresholds to a candidate and emits an auditable
/// decision.
///
/// Core gates always run; calibration gates run only when both their
/// threshold is configured and a benchmark report is supplied. Missing
/// optional inputs narrow which gates run, never cause an error. The
/// audit store is a best-effort side channel: its absence or failure
/// never affects the returned decision.
pub struct PromotionGatekeeper {
    config: GatekeeperConfig,
    audit_store: Option<Arc<dyn RecordStore>>,
}

impl PromotionGatekeeper {
    /// Creates a gatekeeper without an audit store.
    pub fn new(config: GatekeeperConfig) -> Self {
        Self {
            config,
            audit_store: None,
        }
    }

    /// Attaches an audit store for decision persistence.
    pub fn with_audit_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    /// Evaluates every applicable gate and returns the decision.
    pub async fn evaluate(
        &self,
        candidate: &PromotionCandidate,
        benchmark: Option<&BenchmarkReport>,
    ) -> GatekeeperDecision {
        let mut gates = GateLedger::default();

        gates.evaluate(
            "determinism",
            candidate.operation.determinism,
            self.config.min_determinism,
        );
        gates.evaluate(
            "composite_score",
            candidate.composite_score,
            self.config.min_confidence,
        );
        gates.evaluate_count(
            "observation_count",
            candidate.operation.observation_count,
            self.config.min_observations,
        );

        if let Some(report) = benchmark {
            if let Some(min_f1) = self.config.min_f1 {
                gates.evaluate("f1", report.f1, min_f1);
            }
            if let Some(min_accuracy) = self.config.min_accuracy {
                gates.evaluate("accuracy", report.accuracy, min_accuracy);
            }
            if let Some(min_mcc) = self.config.min_mcc {
                let matrix = ConfusionMatrix::from_report(report);
                let mcc = calibration::rescale_mcc(calibration::matthews_correlation(&matrix));
                gates.evaluate("mcc", mcc, min_mcc);
            }
        }

        let decision = GatekeeperDecision {
            id: Uuid::new_v4(),
            operation_id: candidate.operation_id(),
            approved: gates.all_passed,
            reasoning: gates.reasoning,
            evidence: gates.evidence,
            timestamp: Utc::now(),
        };

        info!(
            operation_id = %decision.operation_id,
            approved = decision.approved,
            gates = decision.evidence.len(),
            "gatekeeper decision"
        );
        self.persist(&decision).await;
        decision
    }

    async fn persist(&self, decision: &GatekeeperDecision) {
        let Some(ref store) = self.audit_store else {
            return;
        };
        let Ok(data) = serde_json::to_value(decision) else {
            warn!(operation_id = %decision.operation_id, "failed to serialize decision for audit");
            return;
        };
        if let Err(e) = store.append(StoreCategory::Decisions, data).await {
            warn!(
                operation_id = %decision.operation_id,
                error = %e,
                "failed to persist gatekeeper decision"
            );
        }
    }
}

/// Accumulates reasoning and evidence as gates run, in order.
#[derive(Default)]
struct GateLedger {
    reasoning: Vec<String>,
    evidence: Vec<GateEvidence>,
    all_passed: bool,
}

impl GateLedger {
    fn evaluate(&mut self, gate: &str, actual: f64, threshold: f64) {
        let passed = actual >= threshold;
        self.push(gate, actual, threshold, passed, format!("{actual:.2}"), format!("{threshold:.2}"));
    }

    fn evaluate_count(&mut self, gate: &str, actual: u64, threshold: u64) {
        let passed = actual >= threshold;
        self.push(
            gate,
            actual as f64,
            threshold as f64,
            passed,
            actual.to_string(),
            threshold.to_string(),
        );
    }

    fn push(
        &mut self,
        gate: &str,
        actual: f64,
        threshold: f64,
        passed: bool,
        actual_text: String,
        threshold_text: String,
    ) {
        let verdict = if passed { "passed" } else { "failed" };
        self.reasoning
            .push(format!("{gate} {actual_text} vs {threshold_text}: {verdict}"));
        self.evidence.push(GateEvidence {
            gate: gate.to_string(),
            actual,
            threshold,
            passed,
        });
        // First gate initializes the conjunction.
        self.all_passed = if self.evidence.len() == 1 {
            passed
        } else {
            self.all_passed && passed
        };
    }
}
