//! Cross-stage lineage tracking over the provenance graph.
//!
//! Every read re-folds the full stored log; no in-memory graph survives
//! across tracker instances, so two trackers over the same store always
//! agree. Traversal carries a visited set, so cyclic or malformed input
//! degrades to a bounded, deduplicated answer instead of hanging.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArtifactType, LineageEntry};
use crate::domain::ports::{RecordStore, StoreCategory};

/// An artifact with its full upstream and downstream closure.
#[derive(Debug, Clone, Serialize)]
pub struct LineageChain {
    /// The artifact itself, when recorded.
    pub artifact: Option<LineageEntry>,
    /// Everything that (transitively) produced the artifact.
    pub upstream: Vec<LineageEntry>,
    /// Everything (transitively) produced from the artifact.
    pub downstream: Vec<LineageEntry>,
}

/// Direction of a graph traversal.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upstream,
    Downstream,
}

/// Records and queries the provenance graph spanning every pipeline
/// stage.
pub struct LineageTracker {
    store: Arc<dyn RecordStore>,
}

impl LineageTracker {
    /// Creates a tracker over a store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Appends one lineage entry. Pure append; nothing is validated
    /// against the existing graph.
    pub async fn record(&self, entry: &LineageEntry) -> DomainResult<()> {
        self.store
            .append(StoreCategory::Lineage, serde_json::to_value(entry)?)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))
    }

    /// All entries that transitively produced the given artifact.
    pub async fn get_upstream(&self, artifact_id: &str) -> DomainResult<Vec<LineageEntry>> {
        let entries = self.load().await?;
        Ok(traverse(&entries, artifact_id, Direction::Upstream))
    }

    /// All entries transitively produced from the given artifact.
    pub async fn get_downstream(&self, artifact_id: &str) -> DomainResult<Vec<LineageEntry>> {
        let entries = self.load().await?;
        Ok(traverse(&entries, artifact_id, Direction::Downstream))
    }

    /// The artifact plus both closures in one call.
    pub async fn get_chain(&self, artifact_id: &str) -> DomainResult<LineageChain> {
        let entries = self.load().await?;
        let artifact = entries
            .iter()
            .find(|e| e.artifact_id == artifact_id)
            .cloned();
        Ok(LineageChain {
            artifact,
            upstream: traverse(&entries, artifact_id, Direction::Upstream),
            downstream: traverse(&entries, artifact_id, Direction::Downstream),
        })
    }

    /// All entries of one artifact type.
    pub async fn get_by_artifact_type(
        &self,
        artifact_type: ArtifactType,
    ) -> DomainResult<Vec<LineageEntry>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|e| e.artifact_type == artifact_type)
            .collect())
    }

    async fn load(&self) -> DomainResult<Vec<LineageEntry>> {
        let records = self
            .store
            .read(StoreCategory::Lineage)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;
        Ok(records
            .into_iter()
            .filter_map(|r| serde_json::from_value(r.data).ok())
            .collect())
    }
}

/// Breadth-first traversal with a visited set. Edges run through both
/// the `inputs` lists and the `outputs` lists, so a link recorded on
/// either side of an arrow is honored.
fn traverse(entries: &[LineageEntry], start: &str, direction: Direction) -> Vec<LineageEntry> {
    let by_artifact: HashMap<&str, &LineageEntry> = entries
        .iter()
        .map(|e| (e.artifact_id.as_str(), e))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(start);
    let mut result = Vec::new();

    while let Some(current) = queue.pop_front() {
        let mut neighbors: Vec<&str> = Vec::new();

        if let Some(entry) = by_artifact.get(current) {
            let own_edges = match direction {
                Direction::Upstream => &entry.inputs,
                Direction::Downstream => &entry.outputs,
            };
            neighbors.extend(own_edges.iter().map(String::as_str));
        }
        for entry in entries {
            let reverse_edges = match direction {
                Direction::Upstream => &entry.outputs,
                Direction::Downstream => &entry.inputs,
            };
            if reverse_edges.iter().any(|id| id == current) {
                neighbors.push(entry.artifact_id.as_str());
            }
        }

        for neighbor in neighbors {
            if !visited.insert(neighbor) {
                continue;
            }
            if let Some(entry) = by_artifact.get(neighbor) {
                result.push((*entry).clone());
            }
            queue.push_back(neighbor);
        }
    }
    result
}
