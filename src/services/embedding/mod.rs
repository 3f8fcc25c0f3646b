//! Text embedding backends.
//!
//! All backends implement [`Embedder`]. The same embedder (by [`Embedder::model_id`])
//! must be used at ingestion and query time; the vector store enforces this.

mod hashing;
mod http;
mod onnx;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;
pub use onnx::OnnxEmbedder;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingBackend, EmbeddingConfig};

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier recorded in the store manifest.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed chunk texts for indexing. Output order matches input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single user query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Build the embedder selected by the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.backend {
        EmbeddingBackend::Onnx => {
            let model_dir = config.resolved_model_dir().ok_or_else(|| {
                EmbeddingError::ModelNotFound("cannot determine model directory".to_string())
            })?;
            Ok(Box::new(OnnxEmbedder::load(config, &model_dir)?))
        }
        EmbeddingBackend::Http => Ok(Box::new(HttpEmbedder::new(config)?)),
        EmbeddingBackend::Hashing => Ok(Box::new(HashingEmbedder::new(
            config.dimension as usize,
        ))),
    }
}

/// Model id an embedder built from `config` will report, without loading it.
pub fn configured_model_id(config: &EmbeddingConfig) -> String {
    match config.backend {
        EmbeddingBackend::Hashing => HashingEmbedder::MODEL_ID.to_string(),
        EmbeddingBackend::Onnx | EmbeddingBackend::Http => config.model.clone(),
    }
}

/// Scale to unit length; zero vectors are returned unchanged.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Reject vectors whose length differs from the declared dimension.
pub(crate) fn check_dimensions(
    vectors: &[Vec<f32>],
    expected: usize,
) -> Result<(), EmbeddingError> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(EmbeddingError::InvalidResponse(format!(
            "expected {}-dimensional vectors, got {}",
            expected,
            v.len()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[vec![0.0; 3], vec![1.0; 3]], 3).is_ok());
        assert!(check_dimensions(&[vec![0.0; 3], vec![1.0; 2]], 3).is_err());
    }

    #[test]
    fn test_configured_model_id() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Hashing,
            ..Default::default()
        };
        assert_eq!(configured_model_id(&config), HashingEmbedder::MODEL_ID);

        let config = EmbeddingConfig::default();
        assert_eq!(configured_model_id(&config), config.model);
    }

    #[tokio::test]
    async fn test_create_hashing_embedder() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Hashing,
            dimension: 64,
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 64);

        let v = embedder.embed_query("wheat leaf rust").await.unwrap();
        assert_eq!(v.len(), 64);
    }

    #[test]
    fn test_onnx_missing_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            model_dir: Some(dir.path().join("absent")),
            ..Default::default()
        };
        assert!(matches!(
            create_embedder(&config),
            Err(EmbeddingError::ModelNotFound(_))
        ));
    }
}
