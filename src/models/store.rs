use serde::{Deserialize, Serialize};

use super::document::Chunk;

pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// A chunk and its embedding as persisted in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreEntry {
    pub id: String,
    pub chunk: Chunk,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl VectorStoreEntry {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.generate_id(),
            chunk,
            embedding,
        }
    }
}

/// Records which embedding model built a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl StoreManifest {
    pub fn new(embedding_model: impl Into<String>, dimension: usize) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_json_roundtrip() {
        let manifest = StoreManifest::new("hashing-v1", 384);
        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: StoreManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.format_version, MANIFEST_FORMAT_VERSION);
    }
}
