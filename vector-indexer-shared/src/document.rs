//! Document record submitted to a vector-enabled index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single document destined for a vector index.
///
/// The embedding vector arrives precomputed and its dimensionality is not
/// checked here; a mismatch with the index mapping is reported by the store
/// per item.
///
/// Metadata values default to `serde_json::Value` but may be any
/// serializable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord<M = serde_json::Value> {
    /// Identifier, unique within a batch and the target index.
    pub id: String,
    /// Raw text content.
    pub text: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Arbitrary metadata keyed by name.
    #[serde(default)]
    pub metadata: BTreeMap<String, M>,
}

impl<M> DocumentRecord<M> {
    /// Create a record with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: M) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
