use serde::{Deserialize, Serialize};

use super::document::DocumentKind;

/// Per-source-type counters collected while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub files_scanned: u64,
    pub files_loaded: u64,
    pub files_skipped: u64,
    pub documents: u64,
    /// Directory did not exist or could not be listed.
    pub unavailable: bool,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    pub pdf: SourceStats,
    pub csv: SourceStats,
    pub image: SourceStats,
    /// Images whose OCR output was blank.
    pub images_without_text: u64,
    pub chunks_created: u64,
    pub entries_stored: u64,
    pub embedding_model: String,
    pub store_path: String,
    pub duration_ms: u64,
}

impl IngestionReport {
    pub fn stats(&self, kind: DocumentKind) -> &SourceStats {
        match kind {
            DocumentKind::PdfPage => &self.pdf,
            DocumentKind::CsvRow => &self.csv,
            DocumentKind::ImageOcr => &self.image,
        }
    }

    pub fn stats_mut(&mut self, kind: DocumentKind) -> &mut SourceStats {
        match kind {
            DocumentKind::PdfPage => &mut self.pdf,
            DocumentKind::CsvRow => &mut self.csv,
            DocumentKind::ImageOcr => &mut self.image,
        }
    }

    pub fn documents_loaded(&self) -> u64 {
        self.pdf.documents + self.csv.documents + self.image.documents
    }

    pub fn files_loaded(&self) -> u64 {
        self.pdf.files_loaded + self.csv.files_loaded + self.image.files_loaded
    }

    pub fn files_skipped(&self) -> u64 {
        self.pdf.files_skipped + self.csv.files_skipped + self.image.files_skipped
    }
}
