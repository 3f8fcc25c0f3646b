mod config;
mod document;
mod report;
mod search;
mod store;

pub use config::{
    ChunkingConfig, Config, DEFAULT_API_KEY_ENV, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_PROMPT_TEMPLATE, DEFAULT_STORE_PATH,
    EmbeddingBackend, EmbeddingConfig, LlmConfig, OcrConfig, RetrievalConfig, SourcesConfig,
    VectorStoreConfig,
};
pub use document::{Chunk, DocumentKind, SourceDocument};
pub use report::{IngestionReport, SourceStats};
pub use search::{OutputFormat, RetrievalResult, ScoredEntry};
pub use store::{MANIFEST_FORMAT_VERSION, StoreManifest, VectorStoreEntry};
