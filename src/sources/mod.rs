//! Document loaders.
//!
//! Each loader turns one file type into [`SourceDocument`]s so the ingestion
//! pipeline can treat PDFs, CSV tables and OCR'd images uniformly.

mod images;
mod ocr;
mod pdf;
mod tabular;

pub use images::{IMAGE_EXTENSIONS, ImageLoader};
pub use ocr::{OcrEngine, TesseractOcr};
pub use pdf::PdfLoader;
pub use tabular::{CsvLoader, MISSING_VALUE, is_missing_value};

use std::path::{Path, PathBuf};

use crate::error::LoaderError;
use crate::models::{DocumentKind, SourceDocument};
use crate::utils::list_files;

/// Produces documents from a single file.
pub trait DocumentLoader: Send + Sync {
    /// Kind of document this loader emits.
    fn kind(&self) -> DocumentKind;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Whether this loader handles the given file.
    fn accepts(&self, path: &Path) -> bool;

    /// Load zero or more documents from the file.
    fn load(&self, path: &Path) -> Result<Vec<SourceDocument>, LoaderError>;
}

/// Result of scanning one source directory.
#[derive(Debug)]
pub enum DirectoryScan {
    /// Directory is missing or unreadable; the source type is skipped.
    Unavailable(String),
    /// Files the loader accepts, sorted by name.
    Files(Vec<PathBuf>),
}

/// List the files in `dir` that `loader` accepts.
pub fn scan_directory(dir: &Path, loader: &dyn DocumentLoader) -> DirectoryScan {
    match list_files(dir) {
        None => DirectoryScan::Unavailable(format!("{} does not exist", dir.display())),
        Some(Err(e)) => DirectoryScan::Unavailable(format!("cannot read {}: {}", dir.display(), e)),
        Some(Ok(files)) => DirectoryScan::Files(
            files
                .into_iter()
                .filter(|path| loader.accepts(path))
                .collect(),
        ),
    }
}
