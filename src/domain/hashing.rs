//! Content hashing helpers shared across capture, analysis, and storage.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a string.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stable content hash of a JSON value.
///
/// `serde_json` maps are key-sorted by default, so serialization is
/// canonical for equal values regardless of original key order.
pub fn hash_value(value: &serde_json::Value) -> String {
    sha256_hex(&value.to_string())
}
