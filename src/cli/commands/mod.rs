mod ask;
mod config;
mod ingest;
mod search;
mod status;

pub use ask::AskArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use search::SearchArgs;

pub use ask::handle_ask;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use search::handle_search;
pub use status::handle_status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::Config;
use crate::services::{Embedder, Retriever, VectorStore, create_embedder};

/// Load the config from `--config` or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load().context("failed to load config"),
    }
}

/// Build a retriever over the configured store using the configured embedder.
fn build_retriever(config: &Config, top_k: Option<u32>) -> Result<Retriever> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }

    let embedder: Arc<dyn Embedder> = Arc::from(
        create_embedder(&config.embedding).context("failed to initialise embedding model")?,
    );
    let store = VectorStore::open(
        &config.vector_store.path,
        embedder.model_id(),
        embedder.dimension(),
    )
    .with_context(|| {
        format!(
            "failed to open vector store at {}",
            config.vector_store.path.display()
        )
    })?;

    Ok(Retriever::new(embedder, Arc::new(store), top_k as usize)?)
}
