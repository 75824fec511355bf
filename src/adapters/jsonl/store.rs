//! Line-oriented append-only store backed by local JSONL files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::hashing::hash_value;
use crate::domain::ports::{RecordEnvelope, RecordStore, StoreCategory, StoreError, StoreResult};

/// Append-only store writing one JSON envelope per line, one file per
/// category, under a single root directory.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    /// Creates a store rooted at the given directory. The directory is
    /// created lazily on first append.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the backing file for a category.
    pub fn category_path(&self, category: StoreCategory) -> PathBuf {
        self.root.join(format!("{}.jsonl", category.as_str()))
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn envelope(category: StoreCategory, data: serde_json::Value) -> RecordEnvelope {
        let checksum = hash_value(&data);
        RecordEnvelope {
            timestamp: Utc::now(),
            category,
            data,
            checksum: Some(checksum),
        }
    }

    async fn write_lines(&self, category: StoreCategory, lines: String) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.category_path(category))
            .await
            .map_err(|e| StoreError::AppendFailed {
                category: category.to_string(),
                message: e.to_string(),
            })?;
        file.write_all(lines.as_bytes())
            .await
            .map_err(|e| StoreError::AppendFailed {
                category: category.to_string(),
                message: e.to_string(),
            })?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn append(&self, category: StoreCategory, data: serde_json::Value) -> StoreResult<()> {
        let mut line = serde_json::to_string(&Self::envelope(category, data))?;
        line.push('\n');
        self.write_lines(category, line).await
    }

    async fn append_batch(
        &self,
        category: StoreCategory,
        records: Vec<serde_json::Value>,
    ) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut lines = String::new();
        for data in records {
            lines.push_str(&serde_json::to_string(&Self::envelope(category, data))?);
            lines.push('\n');
        }
        self.write_lines(category, lines).await
    }

    async fn read(&self, category: StoreCategory) -> StoreResult<Vec<RecordEnvelope>> {
        let path = self.category_path(category);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            // Missing files are empty collections, never an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    category: category.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordEnvelope>(line) {
                Ok(envelope) => records.push(envelope),
                Err(e) => {
                    // Scattered bad lines are skipped, not fatal.
                    warn!(
                        category = %category,
                        line = line_no + 1,
                        error = %e,
                        "skipping malformed store line"
                    );
                }
            }
        }
        Ok(records)
    }

    async fn rewrite(
        &self,
        category: StoreCategory,
        records: Vec<RecordEnvelope>,
    ) -> StoreResult<()> {
        let mut lines = String::new();
        for record in &records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        // Temp file in the same directory, then rename, so a crash can
        // never leave a truncated category file.
        fs::create_dir_all(&self.root).await?;
        let path = self.category_path(category);
        let tmp = path.with_extension("jsonl.tmp");
        fs::write(&tmp, lines).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        store
            .append(StoreCategory::Executions, json!({"tool": "Bash"}))
            .await
            .unwrap();
        store
            .append(StoreCategory::Executions, json!({"tool": "Read"}))
            .await
            .unwrap();

        let records = store.read(StoreCategory::Executions).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data["tool"], "Bash");
        assert_eq!(records[1].data["tool"], "Read");
        assert!(records[0].checksum.is_some());
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        let records = store.read(StoreCategory::Lineage).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        store
            .append(StoreCategory::Sessions, json!({"n": 1}))
            .await
            .unwrap();

        // Corrupt the file with a truncated line between two good ones.
        let path = store.category_path(StoreCategory::Sessions);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"timestamp\": \"partial\n");
        std::fs::write(&path, content).unwrap();
        store
            .append(StoreCategory::Sessions, json!({"n": 2}))
            .await
            .unwrap();

        let records = store.read(StoreCategory::Sessions).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_append_is_single_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        store
            .append_batch(
                StoreCategory::Executions,
                vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
            )
            .await
            .unwrap();

        let records = store.read(StoreCategory::Executions).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        store
            .append_batch(StoreCategory::Executions, vec![])
            .await
            .unwrap();

        assert!(!store.category_path(StoreCategory::Executions).exists());
    }

    #[tokio::test]
    async fn test_rewrite_replaces_category_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        for n in 0..4 {
            store
                .append(StoreCategory::Sessions, json!({"n": n}))
                .await
                .unwrap();
        }

        let mut records = store.read(StoreCategory::Sessions).await.unwrap();
        records.retain(|r| r.data["n"].as_u64().unwrap() % 2 == 0);
        store
            .rewrite(StoreCategory::Sessions, records)
            .await
            .unwrap();

        let after = store.read(StoreCategory::Sessions).await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].data["n"], 0);
        assert_eq!(after[1].data["n"], 2);

        // No temp file is left behind.
        let tmp = store
            .category_path(StoreCategory::Sessions)
            .with_extension("jsonl.tmp");
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_categories_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());

        store
            .append(StoreCategory::Feedback, json!({"op": "a"}))
            .await
            .unwrap();

        assert!(store
            .read(StoreCategory::Decisions)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.read(StoreCategory::Feedback).await.unwrap().len(), 1);
    }
}
