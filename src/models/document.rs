use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What kind of extraction produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PdfPage,
    CsvRow,
    ImageOcr,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::PdfPage => "pdf_page",
            DocumentKind::CsvRow => "csv_row",
            DocumentKind::ImageOcr => "image_ocr",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf_page" => Ok(DocumentKind::PdfPage),
            "csv_row" => Ok(DocumentKind::CsvRow),
            "image_ocr" => Ok(DocumentKind::ImageOcr),
            _ => Err(format!("unknown document kind: {}", s)),
        }
    }
}

/// Raw unit of ingestion input produced by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    /// Originating file name.
    pub source_id: String,
    pub kind: DocumentKind,
    pub metadata: BTreeMap<String, String>,
}

impl SourceDocument {
    pub fn new(content: String, source_id: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            content,
            source_id: source_id.into(),
            kind,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// A bounded slice of a [`SourceDocument`]'s content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub kind: DocumentKind,
    /// Character offset of the first character within the source document.
    pub position: u64,
    /// Index of this chunk within its source document.
    pub chunk_index: u32,
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    pub fn from_document(
        document: &SourceDocument,
        text: String,
        position: u64,
        chunk_index: u32,
    ) -> Self {
        Self {
            text,
            source_id: document.source_id.clone(),
            kind: document.kind,
            position,
            chunk_index,
            metadata: document.metadata.clone(),
        }
    }

    /// Stable identifier derived from where the chunk came from.
    ///
    /// Re-ingesting the same file yields the same id; the store keeps both rows.
    pub fn generate_id(&self) -> String {
        use uuid::Uuid;
        let locator = self
            .metadata
            .get("page")
            .or_else(|| self.metadata.get("row"))
            .map(String::as_str)
            .unwrap_or("-");
        let name = format!(
            "{}:{}:{}:{}",
            self.source_id, self.kind, locator, self.position
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }
}
