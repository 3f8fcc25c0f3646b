//! Image loader: OCR text from crop and disease photos.

use std::path::Path;
use std::sync::Arc;

use image::ImageReader;

use crate::error::LoaderError;
use crate::models::{DocumentKind, SourceDocument};
use crate::sources::{DocumentLoader, OcrEngine};
use crate::utils::{has_extension, source_id, tidy_extracted_text};

/// Extensions handled by [`ImageLoader`], matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

pub struct ImageLoader {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageLoader {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl DocumentLoader for ImageLoader {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ImageOcr
    }

    fn name(&self) -> &str {
        "Image"
    }

    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, IMAGE_EXTENSIONS)
    }

    /// Emits at most one document; blank OCR output yields none.
    fn load(&self, path: &Path) -> Result<Vec<SourceDocument>, LoaderError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let text = tidy_extracted_text(&self.ocr.recognize(&image)?);
        let source = source_id(path);

        if text.is_empty() {
            tracing::warn!(file = %source, engine = self.ocr.name(), "no text found in image");
            return Ok(Vec::new());
        }

        Ok(vec![
            SourceDocument::new(text, source, DocumentKind::ImageOcr)
                .with_metadata("path", path.display())
                .with_metadata("width", image.width())
                .with_metadata("height", image.height()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedOcr, write_blank_image};

    #[test]
    fn test_accepts_extensions_case_insensitively() {
        let loader = ImageLoader::new(Arc::new(ScriptedOcr::new("")));
        for name in ["a.png", "b.JPG", "c.Jpeg", "d.TIFF", "e.bmp"] {
            assert!(loader.accepts(Path::new(name)), "{name}");
        }
        assert!(!loader.accepts(Path::new("f.gif")));
        assert!(!loader.accepts(Path::new("g.pdf")));
    }

    #[test]
    fn test_blank_image_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        write_blank_image(&path);

        let loader = ImageLoader::new(Arc::new(ScriptedOcr::new("  \n\x0c")));
        let docs = loader.load(&path).unwrap();

        assert!(docs.is_empty());
    }

    #[test]
    fn test_ocr_text_becomes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.PNG");
        write_blank_image(&path);

        let loader = ImageLoader::new(Arc::new(ScriptedOcr::new(
            "Late blight of potato\nDark lesions on leaves\n",
        )));
        let docs = loader.load(&path).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Late blight of potato\nDark lesions on leaves");
        assert_eq!(docs[0].source_id, "label.PNG");
        assert_eq!(docs[0].kind, DocumentKind::ImageOcr);
    }

    #[test]
    fn test_undecodable_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let loader = ImageLoader::new(Arc::new(ScriptedOcr::new("text")));
        assert!(matches!(loader.load(&path), Err(LoaderError::Image(_))));
    }
}
