//! Store durability and compaction integration tests.
//!
//! Covers the recovery scenarios the append-only store promises: partial
//! trailing writes never poison later reads, and compaction rewrites
//! survive as complete files.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use reflex::adapters::{CompactionOptions, Compactor};
use reflex::domain::hashing::hash_value;
use reflex::{JsonlStore, RecordEnvelope, RecordStore, StoreCategory};

#[tokio::test]
async fn test_partial_trailing_write_is_recovered_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());

    store
        .append(StoreCategory::Executions, json!({"n": 1}))
        .await
        .unwrap();
    store
        .append(StoreCategory::Executions, json!({"n": 2}))
        .await
        .unwrap();

    // Simulate a crash mid-append: a truncated line at the tail.
    let path = store.category_path(StoreCategory::Executions);
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{\"timestamp\":\"2026-08-");
    std::fs::write(&path, content).unwrap();

    let records = store.read(StoreCategory::Executions).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].data["n"], 2);
}

#[tokio::test]
async fn test_compaction_drops_old_entries_and_rewrites_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());

    // Two fresh entries through the store, one stale entry written
    // directly with an old timestamp.
    store
        .append(StoreCategory::Sessions, json!({"session": "new-1"}))
        .await
        .unwrap();
    store
        .append(StoreCategory::Sessions, json!({"session": "new-2"}))
        .await
        .unwrap();
    let stale = RecordEnvelope {
        timestamp: Utc::now() - Duration::days(120),
        category: StoreCategory::Sessions,
        data: json!({"session": "old"}),
        checksum: None,
    };
    let path = store.category_path(StoreCategory::Sessions);
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str(&serde_json::to_string(&stale).unwrap());
    content.push('\n');
    std::fs::write(&path, content).unwrap();

    let compactor = Compactor::new(&store);
    let report = compactor
        .compact(StoreCategory::Sessions, CompactionOptions::max_age_days(90))
        .await;

    assert!(report.error.is_none());
    assert_eq!(report.retained, 2);
    assert_eq!(report.removed, 1);

    // The rewritten file holds exactly the retained entries and no temp
    // file is left behind.
    let records = store.read(StoreCategory::Sessions).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(!path.with_extension("jsonl.tmp").exists());
}

#[tokio::test]
async fn test_checksum_gate_drops_tampered_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());

    store
        .append(StoreCategory::Feedback, json!({"op": "good"}))
        .await
        .unwrap();

    // An entry whose checksum no longer matches its payload.
    let tampered = RecordEnvelope {
        timestamp: Utc::now(),
        category: StoreCategory::Feedback,
        data: json!({"op": "tampered"}),
        checksum: Some(hash_value(&json!({"op": "original"}))),
    };
    let path = store.category_path(StoreCategory::Feedback);
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str(&serde_json::to_string(&tampered).unwrap());
    content.push('\n');
    std::fs::write(&path, content).unwrap();

    let compactor = Compactor::new(&store);
    let report = compactor
        .compact(
            StoreCategory::Feedback,
            CompactionOptions::default().with_checksum_verification(),
        )
        .await;

    assert_eq!(report.retained, 1);
    assert_eq!(report.removed, 1);
    let records = store.read(StoreCategory::Feedback).await.unwrap();
    assert_eq!(records[0].data["op"], "good");
}

#[tokio::test]
async fn test_concurrent_appends_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path()));

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .append(StoreCategory::Executions, json!({"writer": i}))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = store.read(StoreCategory::Executions).await.unwrap();
    assert_eq!(records.len(), 10);
}
