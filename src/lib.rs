//! Reflex - Adaptive Automation Promotion Pipeline
//!
//! Reflex observes AI-agent tool-execution history, identifies operations
//! whose outputs are deterministic for identical inputs, and promotes them
//! to automation candidates. Promoted operations are watched for output
//! drift and demoted when their behavior changes.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, content hashing, and the port
//!   traits storage adapters implement
//! - **Adapter Layer** (`adapters`): Append-only JSONL storage and
//!   compaction
//! - **Service Layer** (`services`): The pipeline stages, capture through
//!   drift monitoring
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading
//!   and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reflex::adapters::JsonlStore;
//! use reflex::infrastructure::config::ConfigLoader;
//! use reflex::services::PromotionDetector;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let store = Arc::new(JsonlStore::new(config.storage.root_dir.clone()));
//!     let detector = PromotionDetector::new(store, config.detector);
//!     for candidate in detector.detect().await? {
//!         println!("{}: {:.2}", candidate.tool_name, candidate.composite_score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::JsonlStore;
pub use domain::models::{
    ClassifiedOperation, CompletionSignal, DemotionDecision, DeterminismClass, GatekeeperDecision,
    LineageEntry, PromotionCandidate, ReflexConfig, SessionObservation, ToolExecutionPair,
};
pub use domain::ports::{RecordEnvelope, RecordStore, StoreCategory};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    DeterminismAnalyzer, DriftMonitor, FeedbackBridge, LineageTracker, PromotionDetector,
    PromotionGatekeeper, SessionObserver,
};
