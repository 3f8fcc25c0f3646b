//! Query pipeline: embed the question, retrieve context, ask the LLM.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::{Captures, Regex};

use crate::error::{ConfigError, QueryError, VectorStoreError};
use crate::models::{RetrievalConfig, RetrievalResult};
use crate::services::{Embedder, LanguageModel, VectorStore};

/// Separator placed between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(context|question)\}").unwrap());

/// A prompt template with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(ConfigError::ValidationError(format!(
                    "prompt template is missing {}",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// Substitute both placeholders in one pass, so text inside the context
    /// that looks like a placeholder is left alone.
    pub fn render(&self, context: &str, question: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "context" => context.to_string(),
                _ => question.to_string(),
            })
            .into_owned()
    }
}

/// Join retrieved chunk texts in ranked order.
pub fn build_context(result: &RetrievalResult) -> String {
    result.texts().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Embeds queries and fetches the closest stored chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    top_k: usize,
}

impl Retriever {
    /// Fails if the store was built with a different embedding model.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
        top_k: usize,
    ) -> Result<Self, QueryError> {
        let manifest = store.manifest();
        if manifest.embedding_model != embedder.model_id() {
            return Err(VectorStoreError::ModelMismatch {
                recorded: manifest.embedding_model,
                requested: embedder.model_id().to_string(),
            }
            .into());
        }
        if manifest.dimension != embedder.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: manifest.dimension,
                actual: embedder.dimension(),
            }
            .into());
        }

        Ok(Self {
            embedder,
            store,
            top_k,
        })
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InvalidQuery("query is empty".to_string()));
        }

        let start = Instant::now();
        let query_vector = self.embedder.embed_query(query).await?;
        let hits = self.store.search(&query_vector, self.top_k)?;

        tracing::debug!(
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved context"
        );

        Ok(RetrievalResult::new(query, hits).with_duration(start.elapsed().as_millis() as u64))
    }
}

/// Full retrieval-augmented answer generation.
pub struct QueryPipeline {
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl QueryPipeline {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LanguageModel>,
        config: &RetrievalConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            retriever,
            llm,
            template: PromptTemplate::new(config.prompt_template.clone())?,
        })
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Assemble the prompt for `question` from a retrieval result.
    pub fn build_prompt(&self, question: &str, result: &RetrievalResult) -> String {
        self.template.render(&build_context(result), question)
    }

    /// Answer `question`, returning the model's text unmodified.
    pub async fn ask(&self, question: &str) -> Result<String, QueryError> {
        let result = self.retriever.retrieve(question).await?;
        self.answer(question, &result).await
    }

    /// Answer `question` from an already retrieved context.
    pub async fn answer(
        &self,
        question: &str,
        result: &RetrievalResult,
    ) -> Result<String, QueryError> {
        let prompt = self.build_prompt(question, result);

        let start = Instant::now();
        let answer = self.llm.generate(&prompt).await?;
        tracing::info!(
            model = self.llm.name(),
            chunks = result.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "answered query"
        );

        Ok(answer)
    }
}
