mod chunker;
mod embedding;
mod ingest;
mod llm;
mod retriever;
mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{
    Embedder, HashingEmbedder, HttpEmbedder, OnnxEmbedder, configured_model_id, create_embedder,
};
pub use ingest::{IngestOptions, run_ingestion};
pub use llm::{GeminiClient, LanguageModel};
pub use retriever::{CONTEXT_SEPARATOR, PromptTemplate, QueryPipeline, Retriever, build_context};
pub use vector_store::{DATABASE_FILE, MANIFEST_FILE, VectorStore, cosine_similarity};
