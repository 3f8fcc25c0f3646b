//! Error types for the CropSense RAG core.

use thiserror::Error;

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("missing API key: set {0} in the environment or .env")]
    MissingApiKey(String),
}

/// Errors raised while turning a single source file into documents.
///
/// The ingestion pipeline logs these and skips the file.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no columns to parse in {0}")]
    NoColumns(String),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Errors from the OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR command not found: {0}")]
    CommandNotFound(String),

    #[error("OCR execution error: {0}")]
    ExecutionError(String),

    #[error("failed to encode image for OCR: {0}")]
    EncodeError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model load error: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store is empty; run ingestion first")]
    EmptyStore,

    #[error(
        "embedding model mismatch: store was built with '{recorded}', but '{requested}' is configured"
    )]
    ModelMismatch { recorded: String, requested: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store not found at {0}")]
    NotFound(String),

    #[error("manifest error: {0}")]
    ManifestError(String),

    #[error("invalid search: {0}")]
    InvalidSearch(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from the hosted language model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("LLM refused to answer: {0}")]
    Refused(String),

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("nothing to ingest: no documents were produced from any source")]
    EmptyCorpus,

    #[error("config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),
}

/// Errors related to answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),
}

impl QueryError {
    /// True when the store had nothing to ground an answer on.
    pub fn is_empty_store(&self) -> bool {
        matches!(self, QueryError::VectorStoreError(VectorStoreError::EmptyStore))
    }
}
