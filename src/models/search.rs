//! Search-related models for retrieval results.

use serde::{Deserialize, Serialize};

use super::store::VectorStoreEntry;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A stored entry together with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    /// 1-based rank, closest first
    pub rank: u32,

    /// Cosine similarity (-1.0 to 1.0)
    pub score: f32,

    pub entry: VectorStoreEntry,
}

/// Top-K entries for a query, closest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Query that was executed
    pub query: String,

    pub hits: Vec<ScoredEntry>,

    /// Query execution time in milliseconds
    pub duration_ms: u64,
}

impl RetrievalResult {
    pub fn new(query: impl Into<String>, hits: Vec<ScoredEntry>) -> Self {
        Self {
            query: query.into(),
            hits,
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Chunk texts in ranked order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.entry.chunk.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_empty_result() {
        let result = RetrievalResult::new("leaf rust", vec![]).with_duration(12);
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert_eq!(result.duration_ms, 12);
    }
}
