use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::{Axis, Ix3};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, check_dimensions, normalize};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Local sentence-transformers model (e.g. all-MiniLM-L6-v2) exported to ONNX.
///
/// Expects `model.onnx` and `tokenizer.json` in the model directory. Token
/// states are mean-pooled over the attention mask and L2-normalised.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    dimension: usize,
    uses_token_type_ids: bool,
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?;

        let uses_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens as usize,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::debug!(
            model = %config.model,
            path = %model_path.display(),
            uses_token_type_ids,
            "loaded ONNX embedding model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.model.clone(),
            dimension: config.dimension as usize,
            uses_token_type_ids,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len() {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types.get(j).copied().unwrap_or(0) as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = if self.uses_token_type_ids {
            let token_type_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        }
        .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?
            .into_dimensionality::<Ix3>()
            .map_err(|e| EmbeddingError::InferenceError(format!("unexpected output shape: {}", e)))?;

        // Mean pooling over real (unpadded) tokens.
        let embeddings: Vec<Vec<f32>> = hidden
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, tokens)| {
                let mut sum = vec![0.0f32; tokens.shape()[1]];
                let mut count = 0.0f32;
                for (j, token) in tokens.axis_iter(Axis(0)).enumerate() {
                    if attention_mask[i * max_len + j] == 0 {
                        continue;
                    }
                    count += 1.0;
                    for (acc, value) in sum.iter_mut().zip(token.iter()) {
                        *acc += value;
                    }
                }
                if count > 0.0 {
                    sum.iter_mut().for_each(|x| *x /= count);
                }
                normalize(&sum)
            })
            .collect();

        check_dimensions(&embeddings, self.dimension)?;
        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_batch(texts)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxEmbedder::load(&EmbeddingConfig::default(), dir.path());
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
