//! Append-only record store port.
//!
//! One logical category per pipeline concern. Every record is a single
//! line on disk: an envelope of `{timestamp, category, data}` plus an
//! optional embedded checksum. Readers skip malformed lines rather than
//! fail, and a missing category reads as an empty collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from append-only store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to append to {category}: {message}")]
    AppendFailed {
        /// Target category.
        category: String,
        /// Underlying failure.
        message: String,
    },

    #[error("Failed to read {category}: {message}")]
    ReadFailed {
        /// Target category.
        category: String,
        /// Underlying failure.
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Logical store categories, one per pipeline concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreCategory {
    /// Tool-execution pairs from transcript capture.
    Executions,
    /// Persistent session observations.
    Sessions,
    /// Drift events from post-promotion monitoring.
    Feedback,
    /// Gatekeeper decisions (audit log).
    Decisions,
    /// Provenance graph entries.
    Lineage,
}

impl StoreCategory {
    /// File-name stem / stored string for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executions => "executions",
            Self::Sessions => "sessions",
            Self::Feedback => "feedback",
            Self::Decisions => "decisions",
            Self::Lineage => "lineage",
        }
    }

    /// All categories, for batch operations such as compaction.
    pub fn all() -> [Self; 5] {
        [
            Self::Executions,
            Self::Sessions,
            Self::Feedback,
            Self::Decisions,
            Self::Lineage,
        ]
    }
}

impl std::fmt::Display for StoreCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored line: timestamped envelope around an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope {
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,

    /// Category the record belongs to.
    pub category: StoreCategory,

    /// Record payload.
    pub data: serde_json::Value,

    /// SHA-256 hex digest of the serialized payload, when written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Append-only store abstraction consumed by every stateful component.
///
/// Implementations must keep appends atomic at line granularity and must
/// tolerate concurrent readers; cross-process write coordination is the
/// caller's responsibility.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a single record to a category.
    async fn append(&self, category: StoreCategory, data: serde_json::Value) -> StoreResult<()>;

    /// Append a batch of records to a category in one write.
    async fn append_batch(
        &self,
        category: StoreCategory,
        records: Vec<serde_json::Value>,
    ) -> StoreResult<()>;

    /// Read all parseable records in a category, oldest first.
    ///
    /// Malformed or partial lines are skipped; a missing category file
    /// yields an empty vector.
    async fn read(&self, category: StoreCategory) -> StoreResult<Vec<RecordEnvelope>>;

    /// Replace a category's contents with exactly the given records.
    ///
    /// The replacement must be atomic: a crash mid-rewrite leaves either
    /// the old contents or the new, never a truncated mix. Original
    /// envelope timestamps are preserved.
    async fn rewrite(
        &self,
        category: StoreCategory,
        records: Vec<RecordEnvelope>,
    ) -> StoreResult<()>;
}
