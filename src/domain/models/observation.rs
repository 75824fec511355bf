//! Domain models for tiered session observations.
//!
//! A session observation is the summarized signal extracted from one
//! completed session. Low-signal observations are buffered as `ephemeral`
//! and may later be squashed into a single aggregate that is re-evaluated
//! for promotion to the `persistent` store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationSource {
    /// Fresh session start.
    Startup,
    /// Resumed from a previous session.
    Resume,
    /// Source could not be determined.
    Unknown,
}

impl ObservationSource {
    /// String form used in logs and stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Resume => "resume",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a source string, defaulting unknown values.
    pub fn parse_str(s: &str) -> Self {
        match s {
            "startup" => Self::Startup,
            "resume" => Self::Resume,
            _ => Self::Unknown,
        }
    }
}

/// Why the observation was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationReason {
    /// Session ended normally.
    SessionEnd,
    /// Synthetic aggregate produced by squashing ephemeral entries.
    Squash,
}

/// Signal tier assigned by the tiering function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationTier {
    /// Low-signal; buffered in memory, candidate for squashing.
    Ephemeral,
    /// High-signal; written to the persistent store.
    Persistent,
}

/// Counted activity within one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// User + assistant messages.
    pub message_count: u64,
    /// Tool invocations.
    pub tool_call_count: u64,
    /// Distinct files touched.
    pub file_count: u64,
    /// Shell commands run.
    pub command_count: u64,
}

/// Summarized observation of one session (or a squashed aggregate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionObservation {
    /// Session identifier, or a synthetic id for squashed aggregates.
    pub session_id: String,

    /// Where the session came from.
    pub source: ObservationSource,

    /// Why this observation exists.
    pub reason: ObservationReason,

    /// Counted activity.
    pub metrics: SessionMetrics,

    /// Most frequent tools, descending by count.
    pub top_tools: Vec<(String, u64)>,

    /// Most frequent commands, descending by count.
    pub top_commands: Vec<(String, u64)>,

    /// Wall-clock duration in minutes.
    pub duration_minutes: f64,

    /// Assigned tier.
    pub tier: ObservationTier,

    /// When this is a squashed aggregate: how many entries were merged.
    pub squashed_from: Option<usize>,

    /// When the observation was created.
    pub timestamp: DateTime<Utc>,
}

/// Minimal metadata cached at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    /// Session identifier.
    pub session_id: String,
    /// Path to the session transcript.
    pub transcript_path: String,
    /// Working directory.
    pub cwd: String,
    /// Session source.
    pub source: ObservationSource,
    /// Model identifier, when known.
    pub model: Option<String>,
    /// Start time.
    pub started_at: DateTime<Utc>,
}

impl SessionStart {
    /// Fallback metadata used when a session ends without a cached start.
    pub fn defaults(session_id: impl Into<String>, transcript_path: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript_path: transcript_path.into(),
            cwd: String::new(),
            source: ObservationSource::Unknown,
            model: None,
            started_at: Utc::now(),
        }
    }
}

/// Session-end notification handed to the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnd {
    /// Session identifier.
    pub session_id: String,
    /// Path to the session transcript.
    pub transcript_path: String,
    /// End time.
    pub ended_at: DateTime<Utc>,
}
