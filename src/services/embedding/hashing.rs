use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{Embedder, normalize};
use crate::error::EmbeddingError;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const BIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder.
///
/// Lowercased word unigrams and bigrams are hashed into signed buckets and the
/// result is L2-normalised. Needs no model files or network, so it works for
/// offline runs and tests. Retrieval quality is lexical only.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const MODEL_ID: &'static str = "cropsense/hashing-v1";

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            self.add_feature(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        normalize(&vector)
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bytes);

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
