use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{DocumentKind, IngestionReport, OutputFormat, RetrievalResult, StoreManifest};

pub trait Formatter {
    fn format_retrieval(&self, result: &RetrievalResult) -> String;
    fn format_answer(&self, question: &str, answer: &str) -> String;
    fn format_ingestion_report(&self, report: &IngestionReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub store_path: String,
    pub manifest: Option<StoreManifest>,
    pub entries: u64,
    pub configured_model: String,
    pub embedding_backend: String,
    /// None when there is no store to compare against.
    pub model_matches: Option<bool>,
    pub sources: Vec<SourceDirInfo>,
    pub ocr_available: bool,
    pub llm_model: String,
    pub api_key_set: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDirInfo {
    pub kind: DocumentKind,
    pub path: String,
    pub exists: bool,
}

const SOURCE_ROWS: [(&str, DocumentKind); 3] = [
    ("PDF", DocumentKind::PdfPage),
    ("CSV", DocumentKind::CsvRow),
    ("Image", DocumentKind::ImageOcr),
];

fn preview(text: &str, limit: usize) -> String {
    let head: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        format!("{}...", head)
    } else {
        head
    }
}

fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_retrieval(&self, result: &RetrievalResult) -> String {
        if result.is_empty() {
            return format!("No results found for: {}\n", result.query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", result.query).unwrap();
        writeln!(
            output,
            "Found {} results in {}ms\n",
            result.len(),
            result.duration_ms
        )
        .unwrap();

        for hit in &result.hits {
            let chunk = &hit.entry.chunk;
            writeln!(output, "{}. [Score: {:.3}]", hit.rank, hit.score).unwrap();
            writeln!(output, "   Source: {} ({})", chunk.source_id, chunk.kind).unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&chunk.text, 200).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_answer(&self, _question: &str, answer: &str) -> String {
        format!("{}\n", answer)
    }

    fn format_ingestion_report(&self, report: &IngestionReport) -> String {
        let mut output = String::new();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        for (name, kind) in SOURCE_ROWS {
            let stats = report.stats(kind);
            if stats.unavailable {
                writeln!(output, "{:<7} directory not found, skipped", name).unwrap();
            } else {
                writeln!(
                    output,
                    "{:<7} {} loaded, {} skipped, {} documents",
                    name, stats.files_loaded, stats.files_skipped, stats.documents
                )
                .unwrap();
            }
        }
        if report.images_without_text > 0 {
            writeln!(output, "Images without text: {}", report.images_without_text).unwrap();
        }
        writeln!(output, "Chunks created: {}", report.chunks_created).unwrap();
        writeln!(output, "Entries stored: {}", report.entries_stored).unwrap();
        writeln!(output, "Model: {}", report.embedding_model).unwrap();
        writeln!(output, "Store: {}", report.store_path).unwrap();
        writeln!(output, "Duration: {}ms", report.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        match &status.manifest {
            Some(manifest) => {
                writeln!(output, "Vector Store:  [READY] {}", status.store_path).unwrap();
                writeln!(output, "  Entries:     {}", status.entries).unwrap();
                writeln!(output, "  Model:       {}", manifest.embedding_model).unwrap();
                writeln!(output, "  Dimension:   {}", manifest.dimension).unwrap();
                writeln!(output, "  Updated:     {}", manifest.updated_at).unwrap();
            }
            None => {
                writeln!(output, "Vector Store:  [MISSING] {}", status.store_path).unwrap();
            }
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Embedding:     {} ({})",
            status.configured_model, status.embedding_backend
        )
        .unwrap();
        match status.model_matches {
            Some(true) => writeln!(output, "  Matches store").unwrap(),
            Some(false) => writeln!(output, "  MISMATCH: re-run ingest with --reset").unwrap(),
            None => {}
        }
        writeln!(output).unwrap();

        writeln!(output, "Sources:").unwrap();
        for src in &status.sources {
            writeln!(output, "  {} {:<9} {}", mark(src.exists), src.kind, src.path).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(output, "OCR:           {}", mark(status.ocr_available)).unwrap();
        writeln!(
            output,
            "LLM:           {} (API key {})",
            status.llm_model,
            if status.api_key_set { "set" } else { "missing" }
        )
        .unwrap();

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_retrieval(&self, result: &RetrievalResult) -> String {
        let hits: Vec<serde_json::Value> = result
            .hits
            .iter()
            .map(|hit| {
                serde_json::json!({
                    "rank": hit.rank,
                    "score": hit.score,
                    "id": hit.entry.id,
                    "source_id": hit.entry.chunk.source_id,
                    "kind": hit.entry.chunk.kind,
                    "position": hit.entry.chunk.position,
                    "metadata": hit.entry.chunk.metadata,
                    "text": hit.entry.chunk.text,
                })
            })
            .collect();

        self.render(&serde_json::json!({
            "query": result.query,
            "duration_ms": result.duration_ms,
            "hits": hits,
        }))
    }

    fn format_answer(&self, question: &str, answer: &str) -> String {
        self.render(&serde_json::json!({"question": question, "answer": answer}))
    }

    fn format_ingestion_report(&self, report: &IngestionReport) -> String {
        self.render(report)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_retrieval(&self, result: &RetrievalResult) -> String {
        if result.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", result.query);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", result.query).unwrap();
        writeln!(
            output,
            "Found {} results in {}ms\n",
            result.len(),
            result.duration_ms
        )
        .unwrap();

        for hit in &result.hits {
            let chunk = &hit.entry.chunk;
            writeln!(output, "### {}. Score: {:.3}\n", hit.rank, hit.score).unwrap();
            writeln!(output, "**Source:** `{}` ({})\n", chunk.source_id, chunk.kind).unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", chunk.text).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_answer(&self, question: &str, answer: &str) -> String {
        format!("## {}\n\n{}\n", question, answer)
    }

    fn format_ingestion_report(&self, report: &IngestionReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Ingestion Complete\n").unwrap();
        writeln!(output, "| Source | Loaded | Skipped | Documents |").unwrap();
        writeln!(output, "|--------|--------|---------|-----------|").unwrap();
        for (name, kind) in SOURCE_ROWS {
            let stats = report.stats(kind);
            if stats.unavailable {
                writeln!(output, "| {} | - | - | *directory not found* |", name).unwrap();
            } else {
                writeln!(
                    output,
                    "| {} | {} | {} | {} |",
                    name, stats.files_loaded, stats.files_skipped, stats.documents
                )
                .unwrap();
            }
        }
        writeln!(output).unwrap();
        writeln!(output, "- **Chunks created:** {}", report.chunks_created).unwrap();
        writeln!(output, "- **Entries stored:** {}", report.entries_stored).unwrap();
        if report.images_without_text > 0 {
            writeln!(output, "- **Images without text:** {}", report.images_without_text).unwrap();
        }
        writeln!(output, "- **Model:** `{}`", report.embedding_model).unwrap();
        writeln!(output, "- **Store:** `{}`", report.store_path).unwrap();
        writeln!(output, "- **Duration:** {}ms", report.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        let store_status = if status.manifest.is_some() { "✅" } else { "❌" };
        writeln!(output, "### Vector Store {}\n", store_status).unwrap();
        writeln!(output, "- **Path:** `{}`", status.store_path).unwrap();
        if let Some(ref manifest) = status.manifest {
            writeln!(output, "- **Entries:** {}", status.entries).unwrap();
            writeln!(output, "- **Model:** `{}`", manifest.embedding_model).unwrap();
            writeln!(output, "- **Dimension:** {}", manifest.dimension).unwrap();
        }
        writeln!(output).unwrap();

        let model_status = match status.model_matches {
            Some(false) => "⚠️",
            _ => "✅",
        };
        writeln!(output, "### Embedding {}\n", model_status).unwrap();
        writeln!(
            output,
            "- **Configured:** `{}` ({})",
            status.configured_model, status.embedding_backend
        )
        .unwrap();
        writeln!(output).unwrap();

        writeln!(output, "### Sources\n").unwrap();
        writeln!(output, "| Kind | Path | Status |").unwrap();
        writeln!(output, "|------|------|--------|").unwrap();
        for src in &status.sources {
            let exists = if src.exists { "✅" } else { "❌" };
            writeln!(output, "| {} | `{}` | {} |", src.kind, src.path, exists).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(output, "- **OCR:** {}", mark(status.ocr_available)).unwrap();
        writeln!(
            output,
            "- **LLM:** `{}` (API key {})",
            status.llm_model,
            if status.api_key_set { "set" } else { "missing" }
        )
        .unwrap();

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ScoredEntry, SourceDocument, VectorStoreEntry};

    fn sample_result() -> RetrievalResult {
        let doc = SourceDocument::new(
            "Commodity: Onion, Price: N/A".to_string(),
            "mandi.csv",
            DocumentKind::CsvRow,
        );
        let chunk = Chunk::from_document(&doc, doc.content.clone(), 0, 0);
        RetrievalResult::new(
            "onion price",
            vec![ScoredEntry {
                rank: 1,
                score: 0.912,
                entry: VectorStoreEntry::new(chunk, vec![0.1, 0.2]),
            }],
        )
    }

    #[test]
    fn test_text_retrieval() {
        let output = TextFormatter.format_retrieval(&sample_result());
        assert!(output.contains("1. [Score: 0.912]"));
        assert!(output.contains("Source: mandi.csv (csv_row)"));
        assert!(output.contains("Commodity: Onion, Price: N/A"));
    }

    #[test]
    fn test_json_retrieval_omits_embeddings() {
        let output = JsonFormatter::new(false).format_retrieval(&sample_result());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["query"], "onion price");
        assert_eq!(value["hits"][0]["source_id"], "mandi.csv");
        assert_eq!(value["hits"][0]["kind"], "csv_row");
        assert!(value["hits"][0].get("embedding").is_none());
    }

    #[test]
    fn test_text_answer_is_verbatim() {
        assert_eq!(
            TextFormatter.format_answer("q", "Spray neem oil."),
            "Spray neem oil.\n"
        );
    }

    #[test]
    fn test_report_marks_unavailable_sources() {
        let mut report = IngestionReport::default();
        report.csv.unavailable = true;
        report.pdf.files_loaded = 2;

        let output = TextFormatter.format_ingestion_report(&report);
        assert!(output.contains("CSV     directory not found, skipped"));
        assert!(output.contains("PDF     2 loaded, 0 skipped"));
    }
}
