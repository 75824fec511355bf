//! Ports: abstractions over external collaborators.

pub mod record_store;

pub use record_store::{RecordEnvelope, RecordStore, StoreCategory, StoreError, StoreResult};
