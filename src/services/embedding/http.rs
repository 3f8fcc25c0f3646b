//! Embedding client for a text-embeddings-inference compatible server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Embedder, check_dimensions};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
    normalize: bool,
}

/// Embeds text by calling a remote `/embed` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model_id: String,
    dimension: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model_id: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    /// Check that the server answers on `/health`.
    pub async fn health_check(&self) -> Result<(), EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ServerError(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            inputs: texts,
            truncate: true,
            normalize: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::ConnectionError(e.to_string())
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "sent {} texts, received {} vectors",
                texts.len(),
                embeddings.len()
            )));
        }
        check_dimensions(&embeddings, self.dimension)?;

        Ok(embeddings)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_single_batch(chunk).await?);
        }

        Ok(all_embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimming() {
        let config = EmbeddingConfig {
            url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let embedder = HttpEmbedder::new(&config).unwrap();
        assert_eq!(embedder.base_url(), "http://localhost:8080");
        assert_eq!(embedder.model_id(), config.model);
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_request_body() {
        let inputs = vec!["onion price".to_string()];
        let body = serde_json::to_value(EmbedRequest {
            inputs: &inputs,
            truncate: true,
            normalize: true,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"inputs": ["onion price"], "truncate": true, "normalize": true})
        );
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let config = EmbeddingConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let embedder = HttpEmbedder::new(&config).unwrap();
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let config = EmbeddingConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let embedder = HttpEmbedder::new(&config).unwrap();
        assert!(embedder.embed_query("wheat").await.is_err());
        assert!(embedder.health_check().await.is_err());
    }
}
