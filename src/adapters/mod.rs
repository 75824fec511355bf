//! Adapters implementing domain ports against concrete backends.

pub mod jsonl;

pub use jsonl::{CompactionOptions, CompactionReport, Compactor, JsonlStore};
