//! Bridges external completion signals into drift monitoring.
//!
//! The execution layer that runs promoted automations lives outside this
//! crate; it reports back one `CompletionSignal` per run. The bridge
//! persists the raw signal, hashes the observed output, and hands the
//! comparison to the drift monitor.

use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::hashing::sha256_hex;
use crate::domain::models::{CompletionSignal, DemotionDecision, SignalStatus};
use crate::domain::ports::{RecordStore, StoreCategory};

use super::drift_monitor::DriftMonitor;

/// Consumes completion signals and feeds them into the drift monitor.
pub struct FeedbackBridge {
    store: Arc<dyn RecordStore>,
    monitor: Arc<DriftMonitor>,
}

impl FeedbackBridge {
    /// Creates a bridge persisting signals to the given store.
    pub fn new(store: Arc<dyn RecordStore>, monitor: Arc<DriftMonitor>) -> Self {
        Self { store, monitor }
    }

    /// Ingests one signal: persists it, derives the observed output hash,
    /// and runs the drift check against the expected hash.
    ///
    /// Failed runs hash their error text rather than stdout, so a
    /// repeated failure reads as a consistent (drifted) output instead of
    /// a random one.
    pub async fn ingest(
        &self,
        signal: &CompletionSignal,
        expected_hash: &str,
    ) -> DomainResult<DemotionDecision> {
        self.store
            .append(StoreCategory::Feedback, serde_json::to_value(signal)?)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;

        let actual_hash = observed_hash(signal);
        debug!(
            operation_id = %signal.operation_id,
            status = ?signal.status,
            "completion signal ingested"
        );

        self.monitor
            .check(&signal.operation_id, &actual_hash, expected_hash)
            .await
    }
}

fn observed_hash(signal: &CompletionSignal) -> String {
    match signal.status {
        SignalStatus::Success => sha256_hex(&signal.result.stdout),
        SignalStatus::Failure => {
            let error = signal.error.as_deref().unwrap_or("");
            sha256_hex(error)
        }
    }
}
