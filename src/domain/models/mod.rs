//! Serde data model for the promotion pipeline, one file per concern.

pub mod config;
pub mod decision;
pub mod drift;
pub mod feedback;
pub mod lineage;
pub mod observation;
pub mod operation;
pub mod transcript;

pub use config::{
    DetectorConfig, DriftConfig, GatekeeperConfig, LoggingConfig, ObserverConfig,
    ObserverRateLimit, ReflexConfig, RetentionConfig, StorageConfig,
};
pub use decision::{BenchmarkReport, GateEvidence, GatekeeperDecision};
pub use drift::{DemotionDecision, DriftEvent};
pub use feedback::{CommandOutcome, CompletionSignal, SignalStatus};
pub use lineage::{ArtifactType, LineageEntry};
pub use observation::{
    ObservationReason, ObservationSource, ObservationTier, SessionEnd, SessionMetrics,
    SessionObservation, SessionStart,
};
pub use operation::{
    ClassifiedOperation, DeterminismClass, PromotionCandidate, DETERMINISTIC_THRESHOLD,
    SEMI_DETERMINISTIC_THRESHOLD,
};
pub use transcript::{
    CaptureContext, EntryKind, ExecutionStatus, ToolExecutionPair, TranscriptEntry,
};
