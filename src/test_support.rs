//! Fixtures and stub collaborators shared by unit tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::{LlmError, OcrError};
use crate::models::{Config, EmbeddingBackend};
use crate::services::LanguageModel;
use crate::sources::OcrEngine;

/// Write a PDF with one page per entry of `pages`, each a single line of text.
pub fn write_test_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Write a small all-white image; the format follows the file extension.
pub fn write_blank_image(path: &Path) {
    image::RgbImage::from_pixel(32, 32, image::Rgb([255, 255, 255]))
        .save(path)
        .unwrap();
}

/// OCR engine that returns the same text for every image.
pub struct ScriptedOcr {
    text: String,
}

impl ScriptedOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

/// Language model that records every prompt and answers with fixed text.
pub struct RecordingLlm {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingLlm {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

/// Language model whose upstream is always unavailable.
pub struct FailingLlm;

#[async_trait]
impl LanguageModel for FailingLlm {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

/// Config rooted at `root` using the offline hashing embedder.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.sources.pdf_dir = root.join("raw_pdfs");
    config.sources.csv_dir = root.join("raw_csvs");
    config.sources.image_dir = root.join("raw_images");
    config.vector_store.path = root.join("vector_store");
    config.embedding.backend = EmbeddingBackend::Hashing;
    config.embedding.batch_size = 4;
    config
}
