//! Content hashing for attribute bags
//!
//! Provides [`AttributeHash`], a 32-byte Blake3 digest of an item's
//! serialized attribute content. Two items with the same attribute values
//! hash identically, which lets cache keys be content-addressed.

use std::fmt::{self, Display, Formatter};

/// A 32-byte Blake3 digest of serialized attribute content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeHash([u8; 32]);

impl AttributeHash {
    /// Hash raw bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the JSON encoding of a serializable value
    ///
    /// Map ordering must be deterministic for the hash to be stable, so
    /// callers hash ordered collections (`IndexMap`, `BTreeMap`).
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of_serializable<T>(value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize + ?Sized,
    {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }
}

impl Display for AttributeHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Attribute content could not be hashed
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Serialization to JSON failed
    #[error("attribute serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
