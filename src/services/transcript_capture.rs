//! Transcript capture: streaming parse and tool-execution pairing.
//!
//! Transcripts are streamed line-by-line so peak memory stays bounded for
//! large sessions. Corrupted lines are skipped; a session is unusable only
//! when zero entries survive the parse.

use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::hashing::hash_value;
use crate::domain::models::{
    CaptureContext, ExecutionStatus, ToolExecutionPair, TranscriptEntry,
};
use crate::domain::ports::{RecordStore, StoreCategory};

/// Streams a transcript file into typed entries.
///
/// Corrupted lines and sidechain entries are dropped. Returns
/// [`DomainError::EmptyTranscript`] when nothing usable remains.
pub async fn parse_transcript(path: impl AsRef<Path>) -> DomainResult<Vec<TranscriptEntry>> {
    let path = path.as_ref();
    let file = File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DomainError::TranscriptNotFound(path.display().to_string())
        } else {
            DomainError::IoError(e.to_string())
        }
    })?;

    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptEntry>(&line) {
            Ok(entry) if entry.sidechain => {}
            Ok(entry) => entries.push(entry),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped corrupted transcript lines");
    }
    if entries.is_empty() {
        return Err(DomainError::EmptyTranscript(path.display().to_string()));
    }
    Ok(entries)
}

/// Pairs tool invocations with their results.
///
/// Pending invocations are kept in insertion order. A result carrying an
/// explicit reference id pairs with that invocation; otherwise it pairs
/// with the most recently inserted still-pending one (LIFO fallback,
/// preserved deliberately: changing it changes which input gets associated
/// with which output). Invocations left pending at the end become partial
/// pairs with no output or hash.
pub fn pair_tool_executions(
    entries: &[TranscriptEntry],
    context: &CaptureContext,
) -> Vec<ToolExecutionPair> {
    let mut pending: Vec<&TranscriptEntry> = Vec::new();
    let mut pairs = Vec::new();

    for entry in entries {
        if entry.is_invocation() {
            pending.push(entry);
            continue;
        }
        if !entry.is_result() {
            continue;
        }

        let matched_idx = match entry.result_for {
            Some(ref id) => pending.iter().position(|inv| inv.id == *id),
            None => pending.len().checked_sub(1),
        };
        let Some(idx) = matched_idx else {
            // Result with no pending invocation; nothing to associate.
            continue;
        };
        let invocation = pending.remove(idx);
        pairs.push(complete_pair(invocation, entry, context));
    }

    for invocation in pending {
        pairs.push(partial_pair(invocation, context));
    }
    pairs
}

fn complete_pair(
    invocation: &TranscriptEntry,
    result: &TranscriptEntry,
    context: &CaptureContext,
) -> ToolExecutionPair {
    let output = result.tool_output.clone().unwrap_or(serde_json::Value::Null);
    let output_hash = hash_value(&output);
    ToolExecutionPair {
        id: invocation.id.clone(),
        tool_name: invocation.tool_name.clone().unwrap_or_default(),
        input: invocation
            .tool_input
            .clone()
            .unwrap_or(serde_json::Value::Null),
        output: Some(output),
        output_hash: Some(output_hash),
        status: ExecutionStatus::Complete,
        timestamp: invocation.timestamp,
        context: context.clone(),
    }
}

fn partial_pair(invocation: &TranscriptEntry, context: &CaptureContext) -> ToolExecutionPair {
    ToolExecutionPair {
        id: invocation.id.clone(),
        tool_name: invocation.tool_name.clone().unwrap_or_default(),
        input: invocation
            .tool_input
            .clone()
            .unwrap_or(serde_json::Value::Null),
        output: None,
        output_hash: None,
        status: ExecutionStatus::Partial,
        timestamp: invocation.timestamp,
        context: context.clone(),
    }
}

/// Captures one session: parse, pair, and persist in a single batch
/// append. The append is skipped entirely when the session produced no
/// pairs.
pub async fn capture_session(
    store: &Arc<dyn RecordStore>,
    transcript_path: impl AsRef<Path>,
    context: &CaptureContext,
) -> DomainResult<Vec<ToolExecutionPair>> {
    let entries = parse_transcript(transcript_path).await?;
    let pairs = pair_tool_executions(&entries, context);

    if pairs.is_empty() {
        debug!(session_id = %context.session_id, "no tool executions to persist");
        return Ok(pairs);
    }

    let records: Result<Vec<_>, _> = pairs.iter().map(serde_json::to_value).collect();
    match records {
        Ok(records) => {
            store
                .append_batch(StoreCategory::Executions, records)
                .await
                .map_err(|e| DomainError::StoreError(e.to_string()))?;
        }
        Err(e) => {
            warn!(session_id = %context.session_id, error = %e, "failed to serialize execution pairs");
            return Err(e.into());
        }
    }
    Ok(pairs)
}
