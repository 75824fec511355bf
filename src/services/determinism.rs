//! Determinism analysis over the stored execution corpus.
//!
//! The analyzer is stateless: every call recomputes from the full
//! `executions` store, trading recompute cost for correctness. The fold
//! from records to per-operation groups is a pure function so the
//! materialized view can be unit-tested independently of storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::hashing::hash_value;
use crate::domain::models::{ClassifiedOperation, DeterminismClass, ToolExecutionPair};
use crate::domain::ports::{RecordEnvelope, RecordStore, StoreCategory};

/// Executions sharing one (tool name, normalized-input hash) key.
#[derive(Debug, Clone)]
pub struct OperationGroup {
    /// Tool name.
    pub tool_name: String,
    /// SHA-256 hex digest of the canonicalized input.
    pub input_hash: String,
    /// Execution pairs with an observed output. Partial pairs carry no
    /// output evidence and are excluded before grouping.
    pub pairs: Vec<ToolExecutionPair>,
}

/// Folds stored execution records into operation groups.
///
/// Records that fail to deserialize are skipped, mirroring the
/// skip-malformed-lines behavior of the store itself.
pub fn fold_groups(records: &[RecordEnvelope]) -> Vec<OperationGroup> {
    let mut groups: BTreeMap<(String, String), Vec<ToolExecutionPair>> = BTreeMap::new();

    for record in records {
        let Ok(pair) = serde_json::from_value::<ToolExecutionPair>(record.data.clone()) else {
            continue;
        };
        if pair.output_hash.is_none() {
            continue;
        }
        let key = (pair.tool_name.clone(), hash_value(&pair.input));
        groups.entry(key).or_default().push(pair);
    }

    groups
        .into_iter()
        .map(|((tool_name, input_hash), pairs)| OperationGroup {
            tool_name,
            input_hash,
            pairs,
        })
        .collect()
}

/// Scores one group's reproducibility.
///
/// Variance is the normalized fraction of non-dominant outputs:
/// `(total - dominant) / (total - 1)` for more than one observation,
/// `0.0` otherwise. All-identical outputs score 0.0; all-distinct outputs
/// score 1.0. The interior curve is a calibratable heuristic; only the
/// 0.95 / 0.70 classification boundaries are fixed.
pub fn classify_group(group: &OperationGroup) -> ClassifiedOperation {
    let total = group.pairs.len() as u64;

    let mut output_counts: BTreeMap<&str, u64> = BTreeMap::new();
    for pair in &group.pairs {
        if let Some(ref hash) = pair.output_hash {
            *output_counts.entry(hash.as_str()).or_default() += 1;
        }
    }
    let unique_outputs = output_counts.len() as u64;
    let dominant = output_counts.values().copied().max().unwrap_or(0);

    let variance_score = if total > 1 {
        (total - dominant) as f64 / (total - 1) as f64
    } else {
        0.0
    };
    let determinism = 1.0 - variance_score;

    ClassifiedOperation {
        tool_name: group.tool_name.clone(),
        input_hash: group.input_hash.clone(),
        observation_count: total,
        unique_outputs,
        variance_score,
        determinism,
        classification: DeterminismClass::from_score(determinism),
    }
}

/// Stateless analyzer recomputing classifications from the executions
/// store on every call.
pub struct DeterminismAnalyzer {
    store: Arc<dyn RecordStore>,
}

impl DeterminismAnalyzer {
    /// Creates an analyzer over a store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Groups the full corpus and classifies every group.
    pub async fn analyze(&self) -> DomainResult<Vec<ClassifiedOperation>> {
        Ok(self
            .analyze_groups()
            .await?
            .into_iter()
            .map(|(_, op)| op)
            .collect())
    }

    /// Like [`analyze`](Self::analyze) but keeps the underlying groups,
    /// for consumers that need the raw pairs (e.g. savings estimation).
    pub async fn analyze_groups(
        &self,
    ) -> DomainResult<Vec<(OperationGroup, ClassifiedOperation)>> {
        let records = self
            .store
            .read(StoreCategory::Executions)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;

        Ok(fold_groups(&records)
            .into_iter()
            .map(|group| {
                let classified = classify_group(&group);
                (group, classified)
            })
            .collect())
    }
}
