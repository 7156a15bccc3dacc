//! Cache key derivation for invoice artifacts.
//!
//! The key is a fingerprint of the ordered `(id, name, amount)` sequence:
//!
//! ```text
//! for each entity:  id (i64 LE) | len(name) (u64 LE) | name (UTF-8) | amount (i32 LE)
//! key = hex(sha256(..)[..16])
//! ```
//!
//! The length prefix keeps `("ab", "c")` and `("a", "bc")` apart. Keys are
//! stable across runs and platforms; truncation to 128 bits leaves collisions
//! possible but negligible.

use crate::entity::ProductRecord;
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes kept in a key.
const KEY_BYTES: usize = 16;

/// Extension of every cached artifact.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Deterministic fingerprint of an ordered line item sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `entities` in their given order.
    pub fn from_entities(entities: &[ProductRecord]) -> Self {
        let mut hasher = Sha256::new();
        for entity in entities {
            hasher.update(entity.id.to_le_bytes());
            hasher.update((entity.name.len() as u64).to_le_bytes());
            hasher.update(entity.name.as_bytes());
            hasher.update(entity.amount.to_le_bytes());
        }
        let digest = hasher.finalize();
        CacheKey(hex::encode(&digest[..KEY_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the artifact stored under this key: `<key>.pdf`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, ARTIFACT_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
