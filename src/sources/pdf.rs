//! PDF loader: one document per page.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use crate::error::LoaderError;
use crate::models::{DocumentKind, SourceDocument};
use crate::sources::DocumentLoader;
use crate::utils::{has_extension, source_id, tidy_extracted_text};

#[derive(Debug, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Extract per-page text from an in-memory PDF.
    pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, LoaderError> {
        // pdf-extract panics on some malformed inputs; contain it to this file.
        match catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        })) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(LoaderError::Pdf(e.to_string())),
            Err(_) => Err(LoaderError::Pdf("extractor panicked on malformed PDF".to_string())),
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn kind(&self) -> DocumentKind {
        DocumentKind::PdfPage
    }

    fn name(&self) -> &str {
        "PDF"
    }

    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    fn load(&self, path: &Path) -> Result<Vec<SourceDocument>, LoaderError> {
        let bytes = std::fs::read(path)?;
        let pages = Self::extract_pages(&bytes)?;
        let source = source_id(path);

        let documents = pages
            .into_iter()
            .enumerate()
            .filter_map(|(page, text)| {
                let text = tidy_extracted_text(&text);
                if text.is_empty() {
                    tracing::debug!(file = %source, page, "skipping page without text");
                    return None;
                }
                Some(
                    SourceDocument::new(text, source.clone(), DocumentKind::PdfPage)
                        .with_metadata("page", page)
                        .with_metadata("path", path.display()),
                )
            })
            .collect();

        Ok(documents)
    }
}
