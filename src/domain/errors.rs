//! Domain errors for the Reflex promotion pipeline.

use thiserror::Error;

/// Domain-level errors that can occur in the Reflex system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Transcript yielded no usable entries: {0}")]
    EmptyTranscript(String),

    #[error("Transcript not found: {0}")]
    TranscriptNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Artifact not found in lineage: {0}")]
    ArtifactNotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result alias used throughout the domain and service layers.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
