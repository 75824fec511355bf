//! Domain layer: data model, errors, and storage ports.

pub mod errors;
pub mod hashing;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
