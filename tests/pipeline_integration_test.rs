//! End-to-end pipeline integration tests.
//!
//! Exercises the full path over one shared JSONL store:
//! transcript capture → determinism analysis → promotion detection →
//! gatekeeping → drift monitoring and demotion, with lineage entries
//! recorded at every arrow.
//!
//! Unit tests in the source files cover each stage in isolation; these
//! tests verify the stages compose over real files.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use reflex::domain::hashing::sha256_hex;
use reflex::domain::models::{
    ArtifactType, CaptureContext, CompletionSignal, DetectorConfig, DriftConfig, EntryKind,
    GatekeeperConfig, LineageEntry, TranscriptEntry,
};
use reflex::services::transcript_capture::capture_session;
use reflex::services::{
    DriftMonitor, FeedbackBridge, LineageTracker, PromotionDetector, PromotionGatekeeper,
};
use reflex::{JsonlStore, RecordStore, StoreCategory};

fn invocation(id: &str, tool: &str, input: serde_json::Value) -> TranscriptEntry {
    TranscriptEntry {
        id: id.to_string(),
        parent_id: None,
        session_id: "s1".to_string(),
        timestamp: Utc::now(),
        kind: EntryKind::ToolInvocation,
        sidechain: false,
        tool_name: Some(tool.to_string()),
        tool_input: Some(input),
        tool_output: None,
        result_for: None,
    }
}

fn result_entry(id: &str, output: serde_json::Value, result_for: &str) -> TranscriptEntry {
    TranscriptEntry {
        id: id.to_string(),
        parent_id: None,
        session_id: "s1".to_string(),
        timestamp: Utc::now(),
        kind: EntryKind::ToolResult,
        sidechain: false,
        tool_name: None,
        tool_input: None,
        tool_output: Some(output),
        result_for: Some(result_for.to_string()),
    }
}

/// Writes a transcript holding `n` identical Bash executions plus one
/// nondeterministic group and one non-allowlisted tool.
fn write_transcript(dir: &tempfile::TempDir, n: usize) -> std::path::PathBuf {
    let mut entries = Vec::new();
    for i in 0..n {
        entries.push(invocation(
            &format!("det-{i}"),
            "Bash",
            json!({"command": "cargo --version"}),
        ));
        entries.push(result_entry(
            &format!("det-r{i}"),
            json!("cargo 1.83.0"),
            &format!("det-{i}"),
        ));
    }
    // Same input, different output every time.
    for i in 0..n {
        entries.push(invocation(
            &format!("rand-{i}"),
            "Bash",
            json!({"command": "date"}),
        ));
        entries.push(result_entry(
            &format!("rand-r{i}"),
            json!(format!("output {i}")),
            &format!("rand-{i}"),
        ));
    }
    // Deterministic but not on the allow list.
    for i in 0..n {
        entries.push(invocation(
            &format!("web-{i}"),
            "WebFetch",
            json!({"url": "https://example.com"}),
        ));
        entries.push(result_entry(
            &format!("web-r{i}"),
            json!("<html></html>"),
            &format!("web-{i}"),
        ));
    }

    let path = dir.path().join("transcript.jsonl");
    let lines: Vec<String> = entries
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[tokio::test]
async fn test_capture_to_ranked_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(JsonlStore::new(dir.path().join("store")));
    let path = write_transcript(&dir, 6);

    let context = CaptureContext::new("s1", "/work", "startup");
    let pairs = capture_session(&store, &path, &context).await.unwrap();
    assert_eq!(pairs.len(), 18);

    let detector = PromotionDetector::new(Arc::clone(&store), DetectorConfig::default());
    let candidates = detector.detect().await.unwrap();

    // Only the deterministic allow-listed group survives: the `date`
    // group fails the determinism bar, WebFetch fails the allow list.
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.tool_name, "Bash");
    assert_eq!(candidate.frequency, 6);
    assert!((candidate.operation.determinism - 1.0).abs() < f64::EPSILON);
    assert!(candidate.meets_confidence);
}

#[tokio::test]
async fn test_candidate_through_gatekeeper_with_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(JsonlStore::new(dir.path().join("store")));
    let path = write_transcript(&dir, 6);

    let context = CaptureContext::new("s1", "/work", "startup");
    capture_session(&store, &path, &context).await.unwrap();

    let detector = PromotionDetector::new(Arc::clone(&store), DetectorConfig::default());
    let candidates = detector.detect().await.unwrap();
    let candidate = &candidates[0];

    let gatekeeper = PromotionGatekeeper::new(GatekeeperConfig {
        min_confidence: 0.6,
        ..GatekeeperConfig::default()
    })
    .with_audit_store(Arc::clone(&store));
    let decision = gatekeeper.evaluate(candidate, None).await;

    assert!(decision.approved, "reasoning: {:?}", decision.reasoning);
    assert_eq!(decision.evidence.len(), 3);
    assert_eq!(decision.operation_id, candidate.operation_id());

    let audited = store.read(StoreCategory::Decisions).await.unwrap();
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].data["operation_id"], candidate.operation_id());
}

#[tokio::test]
async fn test_promoted_operation_drifts_and_is_demoted() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(JsonlStore::new(dir.path().join("store")));

    let monitor = Arc::new(DriftMonitor::new(Arc::clone(&store), DriftConfig::default()));
    let bridge = FeedbackBridge::new(Arc::clone(&store), Arc::clone(&monitor));

    let operation_id = "Bash:abc123";
    let expected = sha256_hex("cargo 1.83.0");

    // Healthy runs keep the counter at zero.
    let healthy = CompletionSignal::success(operation_id, "cargo 1.83.0");
    let decision = bridge.ingest(&healthy, &expected).await.unwrap();
    assert!(!decision.demoted);
    assert_eq!(decision.consecutive_mismatches, 0);

    // Three consecutive drifted runs trip the default sensitivity.
    let drifted = CompletionSignal::success(operation_id, "cargo 1.84.0");
    let mut last = bridge.ingest(&drifted, &expected).await.unwrap();
    assert!(!last.demoted);
    last = bridge.ingest(&drifted, &expected).await.unwrap();
    assert!(!last.demoted);
    last = bridge.ingest(&drifted, &expected).await.unwrap();
    assert!(last.demoted);
    assert_eq!(last.consecutive_mismatches, 3);

    // Every ingest left both the raw signal and a drift event in the
    // feedback stream.
    let records = store.read(StoreCategory::Feedback).await.unwrap();
    assert_eq!(records.len(), 8);
}

#[tokio::test]
async fn test_drift_counters_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(JsonlStore::new(dir.path().join("store")));

    let expected = sha256_hex("expected");
    let drifted = CompletionSignal::success("Bash:abc", "drifted");

    {
        let monitor = Arc::new(DriftMonitor::new(Arc::clone(&store), DriftConfig::default()));
        let bridge = FeedbackBridge::new(Arc::clone(&store), monitor);
        bridge.ingest(&drifted, &expected).await.unwrap();
        bridge.ingest(&drifted, &expected).await.unwrap();
    }

    // A fresh monitor rehydrates counters from the persisted events, so
    // the third mismatch demotes.
    let monitor = Arc::new(DriftMonitor::new(Arc::clone(&store), DriftConfig::default()));
    let bridge = FeedbackBridge::new(Arc::clone(&store), monitor);
    let decision = bridge.ingest(&drifted, &expected).await.unwrap();
    assert!(decision.demoted);
    assert_eq!(decision.consecutive_mismatches, 3);
}

#[tokio::test]
async fn test_lineage_spans_the_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(JsonlStore::new(dir.path().join("store")));
    let tracker = LineageTracker::new(Arc::clone(&store));

    for i in 1..=3 {
        tracker
            .record(&LineageEntry::new(
                format!("obs-{i}"),
                ArtifactType::Observation,
                "observation",
            ))
            .await
            .unwrap();
    }
    tracker
        .record(
            &LineageEntry::new("pat-1", ArtifactType::Pattern, "analysis")
                .with_inputs(["obs-1", "obs-2", "obs-3"]),
        )
        .await
        .unwrap();
    tracker
        .record(
            &LineageEntry::new("cand-1", ArtifactType::Candidate, "detection")
                .with_input("pat-1")
                .with_metadata("composite_score", json!(0.91)),
        )
        .await
        .unwrap();
    tracker
        .record(
            &LineageEntry::new("script-1", ArtifactType::Script, "generation")
                .with_input("cand-1"),
        )
        .await
        .unwrap();
    tracker
        .record(
            &LineageEntry::new("dec-1", ArtifactType::Decision, "gatekeeping")
                .with_input("script-1"),
        )
        .await
        .unwrap();
    tracker
        .record(
            &LineageEntry::new("exec-1", ArtifactType::Execution, "execution")
                .with_input("dec-1"),
        )
        .await
        .unwrap();

    let chain = tracker.get_chain("cand-1").await.unwrap();
    assert!(chain.artifact.is_some());
    assert_eq!(chain.upstream.len(), 4);
    assert_eq!(chain.downstream.len(), 3);

    let upstream_ids: Vec<&str> = chain
        .upstream
        .iter()
        .map(|e| e.artifact_id.as_str())
        .collect();
    assert!(upstream_ids.contains(&"pat-1"));
    assert!(upstream_ids.contains(&"obs-1"));

    let downstream_ids: Vec<&str> = chain
        .downstream
        .iter()
        .map(|e| e.artifact_id.as_str())
        .collect();
    assert!(downstream_ids.contains(&"script-1"));
    assert!(downstream_ids.contains(&"exec-1"));
}
