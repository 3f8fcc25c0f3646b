use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080";
pub const DEFAULT_STORE_PATH: &str = "data/vector_store";
pub const DEFAULT_LLM_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_LLM_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are CropSense AI, an expert agriculture advisor helping farmers.

Use the provided context to answer accurately.

Context:
{context}

Question:
{question}

Give clear, practical, step-by-step farming guidance suitable for Indian farmers.";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub ocr: OcrConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cropsense").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if !self.retrieval.prompt_template.contains("{context}")
            || !self.retrieval.prompt_template.contains("{question}")
        {
            return Err(ConfigError::ValidationError(
                "retrieval.prompt_template must contain {context} and {question}".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Directories scanned by the ingestion pipeline. Missing ones are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,

    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,

    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("data/raw_pdfs")
}

fn default_csv_dir() -> PathBuf {
    PathBuf::from("data/raw_csvs")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("data/raw_images")
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            csv_dir: default_csv_dir(),
            image_dir: default_image_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_chunk_size() -> u32 {
    800
}

fn default_chunk_overlap() -> u32 {
    150
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX sentence-transformers model
    #[default]
    Onnx,
    /// text-embeddings-inference compatible HTTP server
    Http,
    /// Offline feature-hashing embedder
    Hashing,
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingBackend::Onnx => write!(f, "onnx"),
            EmbeddingBackend::Http => write!(f, "http"),
            EmbeddingBackend::Hashing => write!(f, "hashing"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model identifier recorded in the store manifest.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    32
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    256
}

impl EmbeddingConfig {
    /// Resolve the ONNX model directory, defaulting to the user's data dir.
    pub fn resolved_model_dir(&self) -> Option<PathBuf> {
        self.model_dir.clone().or_else(|| {
            dirs::data_dir().map(|p| {
                p.join("cropsense")
                    .join("models")
                    .join(self.model.replace('/', "--"))
            })
        })
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            model_dir: None,
            url: default_embedding_url(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Must contain `{context}` and `{question}`.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

fn default_top_k() -> u32 {
    4
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            prompt_template: default_prompt_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_llm_url() -> String {
    DEFAULT_LLM_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

impl LlmConfig {
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_llm_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,

    #[serde(default = "default_ocr_language")]
    pub language: String,
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: default_ocr_language(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.vector_store.path, PathBuf::from(DEFAULT_STORE_PATH));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 400

            [embedding]
            backend = "hashing"
            model = "hashing-v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hashing);
        assert_eq!(config.sources.csv_dir, PathBuf::from("data/raw_csvs"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn test_template_requires_placeholders() {
        let mut config = Config::default();
        config.retrieval.prompt_template = "no placeholders".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 7);
        assert_eq!(loaded.llm.model, DEFAULT_LLM_MODEL);
    }
}
