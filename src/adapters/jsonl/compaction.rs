//! Store compaction: rewrite a category file, dropping stale or
//! corrupted entries.
//!
//! The rewrite goes through a temp file in the same directory followed by
//! an atomic rename, so a crash mid-rewrite can never corrupt or truncate
//! the original. An all-removed result writes an empty file; the file is
//! never deleted.

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use super::store::JsonlStore;
use crate::domain::hashing::hash_value;
use crate::domain::ports::{RecordEnvelope, StoreCategory};

/// Schema predicate applied to each entry's payload when configured.
pub type SchemaCheck = fn(&serde_json::Value) -> bool;

/// What compaction should drop.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionOptions {
    /// Drop entries older than this cutoff.
    pub max_age: Option<Duration>,

    /// Drop entries whose payload fails this predicate.
    pub schema: Option<SchemaCheck>,

    /// Drop entries whose embedded checksum fails verification.
    pub verify_checksums: bool,
}

impl CompactionOptions {
    /// Options dropping entries older than the given number of days.
    pub fn max_age_days(days: i64) -> Self {
        Self {
            max_age: Some(Duration::days(days)),
            ..Self::default()
        }
    }

    /// Enables checksum verification.
    pub fn with_checksum_verification(mut self) -> Self {
        self.verify_checksums = true;
        self
    }

    /// Sets a schema predicate.
    pub fn with_schema(mut self, check: SchemaCheck) -> Self {
        self.schema = Some(check);
        self
    }
}

/// Outcome of compacting one category.
#[derive(Debug, Clone, Serialize)]
pub struct CompactionReport {
    /// Compacted category.
    pub category: StoreCategory,
    /// Entries kept.
    pub retained: usize,
    /// Entries dropped.
    pub removed: usize,
    /// Read/write failure, if any. Present so batch compaction can
    /// continue past one bad file.
    pub error: Option<String>,
}

impl CompactionReport {
    fn failed(category: StoreCategory, error: impl Into<String>) -> Self {
        Self {
            category,
            retained: 0,
            removed: 0,
            error: Some(error.into()),
        }
    }
}

/// Rewrites store category files according to [`CompactionOptions`].
pub struct Compactor<'a> {
    store: &'a JsonlStore,
}

impl<'a> Compactor<'a> {
    /// Creates a compactor over a store.
    pub fn new(store: &'a JsonlStore) -> Self {
        Self { store }
    }

    /// Compacts a single category.
    pub async fn compact(
        &self,
        category: StoreCategory,
        options: CompactionOptions,
    ) -> CompactionReport {
        let path = self.store.category_path(category);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Nothing to compact.
                return CompactionReport {
                    category,
                    retained: 0,
                    removed: 0,
                    error: None,
                };
            }
            Err(e) => return CompactionReport::failed(category, e.to_string()),
        };

        let cutoff = options.max_age.map(|age| Utc::now() - age);
        let mut retained_lines = String::new();
        let mut retained = 0usize;
        let mut removed = 0usize;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(envelope) = serde_json::from_str::<RecordEnvelope>(line) else {
                removed += 1;
                continue;
            };
            if !Self::keep(&envelope, cutoff.as_ref(), &options) {
                removed += 1;
                continue;
            }
            retained_lines.push_str(line);
            retained_lines.push('\n');
            retained += 1;
        }

        // Atomic replace: temp file in the same directory, then rename.
        let tmp_path = path.with_extension("jsonl.tmp");
        if let Err(e) = fs::write(&tmp_path, retained_lines).await {
            return CompactionReport::failed(category, e.to_string());
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            return CompactionReport::failed(category, e.to_string());
        }

        debug!(category = %category, retained, removed, "compacted store category");
        CompactionReport {
            category,
            retained,
            removed,
            error: None,
        }
    }

    /// Compacts every category, continuing past per-category failures.
    pub async fn compact_all(&self, options: CompactionOptions) -> Vec<CompactionReport> {
        let mut reports = Vec::new();
        for category in StoreCategory::all() {
            let report = self.compact(category, options).await;
            if let Some(ref error) = report.error {
                warn!(category = %category, error = %error, "compaction failed for category");
            }
            reports.push(report);
        }
        reports
    }

    fn keep(
        envelope: &RecordEnvelope,
        cutoff: Option<&chrono::DateTime<Utc>>,
        options: &CompactionOptions,
    ) -> bool {
        if let Some(cutoff) = cutoff {
            if envelope.timestamp < *cutoff {
                return false;
            }
        }
        if let Some(schema) = options.schema {
            if !schema(&envelope.data) {
                return false;
            }
        }
        if options.verify_checksums {
            if let Some(ref checksum) = envelope.checksum {
                if hash_value(&envelope.data) != *checksum {
                    return false;
                }
            }
        }
        true
    }
}
