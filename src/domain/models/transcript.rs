//! Domain models for transcript capture and tool-execution pairing.
//!
//! A transcript is the ordered log of one agent session. Capture parses it
//! into typed entries and pairs each tool invocation with its result,
//! producing hashed execution records used by the determinism analyzer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
    /// Tool invocation emitted by the assistant.
    ToolInvocation,
    /// Result returned for a tool invocation.
    ToolResult,
}

/// One line of a session transcript.
///
/// Entries form a linear chain via `parent_id`. Sidechain entries are
/// discarded during parse and never reach pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Unique entry identifier.
    pub id: String,

    /// Parent entry in the chain, if any.
    pub parent_id: Option<String>,

    /// Session this entry belongs to.
    pub session_id: String,

    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,

    /// Entry kind.
    pub kind: EntryKind,

    /// Whether this entry lives on a sidechain (discarded at parse).
    #[serde(default)]
    pub sidechain: bool,

    /// Tool name for invocation entries.
    pub tool_name: Option<String>,

    /// Tool input for invocation entries.
    pub tool_input: Option<serde_json::Value>,

    /// Tool output for result entries.
    pub tool_output: Option<serde_json::Value>,

    /// For result entries: id of the originating invocation, when known.
    pub result_for: Option<String>,
}

impl TranscriptEntry {
    /// Returns true if this entry is a tool invocation carrying a tool name.
    pub fn is_invocation(&self) -> bool {
        self.kind == EntryKind::ToolInvocation && self.tool_name.is_some()
    }

    /// Returns true if this entry is a tool result.
    pub fn is_result(&self) -> bool {
        self.kind == EntryKind::ToolResult
    }
}

/// Completion status of a tool-execution pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Invocation was paired with a result.
    Complete,
    /// Invocation never received a result; output and hash are absent.
    Partial,
}

/// Context in which a session's executions were captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureContext {
    /// Session identifier.
    pub session_id: String,

    /// Working directory at capture time.
    pub cwd: String,

    /// Where the session came from (e.g. "startup", "resume").
    pub source: String,
}

impl CaptureContext {
    /// Creates a capture context for a session.
    pub fn new(
        session_id: impl Into<String>,
        cwd: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: cwd.into(),
            source: source.into(),
        }
    }
}

/// One tool invocation paired with its (possibly missing) result.
///
/// Uniqueness: one pair per originating invocation per session. The id is
/// the originating invocation's entry id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionPair {
    /// Originating invocation id.
    pub id: String,

    /// Name of the invoked tool.
    pub tool_name: String,

    /// Invocation input.
    pub input: serde_json::Value,

    /// Paired output, absent for partial pairs.
    pub output: Option<serde_json::Value>,

    /// SHA-256 hex digest of the stringified output, absent for partial pairs.
    pub output_hash: Option<String>,

    /// Whether the invocation was ever answered.
    pub status: ExecutionStatus,

    /// Invocation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Capture context.
    pub context: CaptureContext,
}
