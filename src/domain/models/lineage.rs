//! Domain models for cross-stage lineage tracking.
//!
//! Each pipeline stage records a lineage entry linking the artifact it
//! produced to the artifacts it consumed, forming a directed provenance
//! graph. The metadata map is the one place a generic key-value bag is
//! kept; every other record in the system is a typed structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of artifact a lineage entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// A session observation.
    Observation,
    /// A classified operation pattern.
    Pattern,
    /// A promotion candidate.
    Candidate,
    /// Generated automation script (produced downstream of gatekeeping).
    Script,
    /// A gatekeeper decision.
    Decision,
    /// A live execution of promoted automation.
    Execution,
}

impl ArtifactType {
    /// String form used in stored records and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Pattern => "pattern",
            Self::Candidate => "candidate",
            Self::Script => "script",
            Self::Decision => "decision",
            Self::Execution => "execution",
        }
    }
}

/// One node of the provenance graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    /// Id of the artifact this entry describes.
    pub artifact_id: String,

    /// Kind of artifact.
    pub artifact_type: ArtifactType,

    /// Pipeline stage that produced the artifact.
    pub stage: String,

    /// Artifact ids consumed to produce this one.
    pub inputs: Vec<String>,

    /// Artifact ids produced from this one, when known at record time.
    pub outputs: Vec<String>,

    /// Free-form edge metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

impl LineageEntry {
    /// Creates an entry with no edges or metadata.
    pub fn new(
        artifact_id: impl Into<String>,
        artifact_type: ArtifactType,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            artifact_type,
            stage: stage.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Adds an input edge.
    pub fn with_input(mut self, artifact_id: impl Into<String>) -> Self {
        self.inputs.push(artifact_id.into());
        self
    }

    /// Adds several input edges.
    pub fn with_inputs<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Adds an output edge.
    pub fn with_output(mut self, artifact_id: impl Into<String>) -> Self {
        self.outputs.push(artifact_id.into());
        self
    }

    /// Adds a metadata key-value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
