//! JSONL-file implementation of the append-only record store.

pub mod compaction;
pub mod store;

pub use compaction::{CompactionOptions, CompactionReport, Compactor};
pub use store::JsonlStore;
