//! Infrastructure layer.
//!
//! Process-level concerns that sit outside the domain:
//! - Configuration loading and validation (figment)
//! - Logging initialization (tracing-subscriber)

pub mod config;
pub mod logging;
