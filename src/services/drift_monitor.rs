//! Post-promotion drift monitoring and demotion.
//!
//! Tracks consecutive live-vs-expected hash mismatches per promoted
//! operation. Counters are a materialized view rebuilt by folding over
//! the feedback log, rehydrated lazily on the first check of a process
//! so restarts continue where the previous process stopped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DemotionDecision, DriftConfig, DriftEvent};
use crate::domain::ports::{RecordEnvelope, RecordStore, StoreCategory};

/// Folds stored drift events into per-operation consecutive-mismatch
/// counters. Later events win; unparseable records are skipped.
pub fn fold_counters(records: &[RecordEnvelope]) -> HashMap<String, u32> {
    let mut counters = HashMap::new();
    for record in records {
        let Ok(event) = serde_json::from_value::<DriftEvent>(record.data.clone()) else {
            continue;
        };
        counters.insert(event.operation_id, event.consecutive_mismatches);
    }
    counters
}

/// Compares live output hashes against historical expectations and
/// decides demotion.
pub struct DriftMonitor {
    config: DriftConfig,
    store: Arc<dyn RecordStore>,
    counters: Mutex<Option<HashMap<String, u32>>>,
}

impl DriftMonitor {
    /// Creates a monitor over a feedback store. No I/O happens until the
    /// first enabled `check`.
    pub fn new(store: Arc<dyn RecordStore>, config: DriftConfig) -> Self {
        Self {
            config,
            store,
            counters: Mutex::new(None),
        }
    }

    /// Compares a live output hash against the expected hash and returns
    /// the demotion decision.
    ///
    /// Every comparison is persisted, matches included: a match is
    /// evidence the automation still holds. When monitoring is disabled
    /// the call is a pure no-op touching no state and no storage.
    pub async fn check(
        &self,
        operation_id: &str,
        actual_hash: &str,
        expected_hash: &str,
    ) -> DomainResult<DemotionDecision> {
        if !self.config.enabled {
            return Ok(DemotionDecision {
                operation_id: operation_id.to_string(),
                demoted: false,
                consecutive_mismatches: 0,
                reason: "drift monitoring disabled".to_string(),
                timestamp: Utc::now(),
            });
        }

        let mut guard = self.counters.lock().await;
        if guard.is_none() {
            let records = self
                .store
                .read(StoreCategory::Feedback)
                .await
                .map_err(|e| DomainError::StoreError(e.to_string()))?;
            *guard = Some(fold_counters(&records));
        }
        let counters = guard.get_or_insert_with(HashMap::new);

        let matched = actual_hash == expected_hash;
        let previous = counters.get(operation_id).copied().unwrap_or(0);
        let new_count = if matched { 0 } else { previous + 1 };
        counters.insert(operation_id.to_string(), new_count);

        let event = DriftEvent {
            operation_id: operation_id.to_string(),
            timestamp: Utc::now(),
            matched,
            actual_hash: actual_hash.to_string(),
            expected_hash: expected_hash.to_string(),
            consecutive_mismatches: new_count,
        };
        self.store
            .append(StoreCategory::Feedback, serde_json::to_value(&event)?)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;

        let demoted = new_count >= self.config.sensitivity;
        let reason = if matched {
            "output matched expected hash; mismatch counter reset".to_string()
        } else if demoted {
            format!(
                "{} consecutive mismatches reached sensitivity {}; demoting",
                new_count, self.config.sensitivity
            )
        } else {
            format!(
                "{} consecutive mismatches below sensitivity {}",
                new_count, self.config.sensitivity
            )
        };

        if demoted {
            warn!(operation_id, consecutive_mismatches = new_count, "demoting drifted operation");
        } else {
            info!(operation_id, matched, consecutive_mismatches = new_count, "drift check");
        }

        Ok(DemotionDecision {
            operation_id: operation_id.to_string(),
            demoted,
            consecutive_mismatches: new_count,
            reason,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::JsonlStore;

    fn monitor(store: &Arc<dyn RecordStore>, config: DriftConfig) -> DriftMonitor {
        DriftMonitor::new(Arc::clone(store), config)
    }

    fn store_in(dir: &tempfile::TempDir) -> Arc<dyn RecordStore> {
        Arc::new(JsonlStore::new(dir.path()))
    }

    #[tokio::test]
    async fn test_three_consecutive_mismatches_demote() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let monitor = monitor(&store, DriftConfig::default());

        let first = monitor.check("op-1", "a", "expected").await.unwrap();
        assert!(!first.demoted);
        assert_eq!(first.consecutive_mismatches, 1);

        let second = monitor.check("op-1", "b", "expected").await.unwrap();
        assert!(!second.demoted);

        let third = monitor.check("op-1", "c", "expected").await.unwrap();
        assert!(third.demoted);
        assert_eq!(third.consecutive_mismatches, 3);
        assert!(third.reason.contains("demoting"));
    }

    #[tokio::test]
    async fn test_match_resets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let monitor = monitor(&store, DriftConfig::default());

        monitor.check("op-1", "a", "expected").await.unwrap();
        monitor.check("op-1", "b", "expected").await.unwrap();

        let reset = monitor.check("op-1", "expected", "expected").await.unwrap();
        assert!(!reset.demoted);
        assert_eq!(reset.consecutive_mismatches, 0);
        assert!(reset.reason.contains("reset"));

        // Counting restarts from zero.
        let next = monitor.check("op-1", "a", "expected").await.unwrap();
        assert_eq!(next.consecutive_mismatches, 1);
    }

    #[tokio::test]
    async fn test_matches_are_persisted_too() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let monitor = monitor(&store, DriftConfig::default());

        monitor.check("op-1", "expected", "expected").await.unwrap();
        monitor.check("op-1", "x", "expected").await.unwrap();

        let records = store.read(StoreCategory::Feedback).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_second_instance_rehydrates_identical_counters() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = monitor(&store, DriftConfig::default());
        first.check("op-1", "a", "expected").await.unwrap();
        first.check("op-1", "b", "expected").await.unwrap();
        first.check("op-2", "expected", "expected").await.unwrap();

        // Fresh instance over the same store continues the counts.
        let second = monitor(&store, DriftConfig::default());
        let decision = second.check("op-1", "c", "expected").await.unwrap();
        assert!(decision.demoted);
        assert_eq!(decision.consecutive_mismatches, 3);

        let other = second.check("op-2", "y", "expected").await.unwrap();
        assert_eq!(other.consecutive_mismatches, 1);
    }

    #[tokio::test]
    async fn test_disabled_monitor_is_a_pure_noop() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = JsonlStore::new(dir.path());
        let store: Arc<dyn RecordStore> = Arc::new(jsonl.clone());
        let monitor = monitor(
            &store,
            DriftConfig {
                enabled: false,
                sensitivity: 3,
            },
        );

        for _ in 0..5 {
            let decision = monitor.check("op-1", "a", "expected").await.unwrap();
            assert!(!decision.demoted);
            assert!(decision.reason.contains("disabled"));
        }
        assert!(!jsonl.category_path(StoreCategory::Feedback).exists());
    }

    #[tokio::test]
    async fn test_custom_sensitivity() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let monitor = monitor(
            &store,
            DriftConfig {
                enabled: true,
                sensitivity: 1,
            },
        );

        let decision = monitor.check("op-1", "a", "expected").await.unwrap();
        assert!(decision.demoted);
    }

    #[test]
    fn test_fold_counters_last_event_wins() {
        let events = [
            DriftEvent {
                operation_id: "op-1".to_string(),
                timestamp: Utc::now(),
                matched: false,
                actual_hash: "a".to_string(),
                expected_hash: "e".to_string(),
                consecutive_mismatches: 2,
            },
            DriftEvent {
                operation_id: "op-1".to_string(),
                timestamp: Utc::now(),
                matched: true,
                actual_hash: "e".to_string(),
                expected_hash: "e".to_string(),
                consecutive_mismatches: 0,
            },
        ];
        let records: Vec<RecordEnvelope> = events
            .iter()
            .map(|e| RecordEnvelope {
                timestamp: e.timestamp,
                category: StoreCategory::Feedback,
                data: serde_json::to_value(e).unwrap(),
                checksum: None,
            })
            .collect();

        let counters = fold_counters(&records);
        assert_eq!(counters.get("op-1"), Some(&0));
    }
}
