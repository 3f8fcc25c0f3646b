use anyhow::Result;

use crate::cli::output::{SourceDirInfo, StatusInfo, get_formatter};
use crate::error::VectorStoreError;
use crate::models::{Config, DocumentKind, OutputFormat};
use crate::services::{VectorStore, configured_model_id};
use crate::sources::TesseractOcr;

pub async fn handle_status(config: &Config, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let configured_model = configured_model_id(&config.embedding);

    let (manifest, entries) = match VectorStore::open_existing(&config.vector_store.path) {
        Ok(store) => (Some(store.manifest()), store.len()? as u64),
        Err(VectorStoreError::NotFound(_)) => (None, 0),
        Err(e) => return Err(e.into()),
    };

    let model_matches = manifest.as_ref().map(|m| {
        m.embedding_model == configured_model && m.dimension == config.embedding.dimension as usize
    });

    let sources = [
        (DocumentKind::PdfPage, &config.sources.pdf_dir),
        (DocumentKind::CsvRow, &config.sources.csv_dir),
        (DocumentKind::ImageOcr, &config.sources.image_dir),
    ]
    .into_iter()
    .map(|(kind, dir)| SourceDirInfo {
        kind,
        path: dir.display().to_string(),
        exists: dir.is_dir(),
    })
    .collect();

    let status = StatusInfo {
        store_path: config.vector_store.path.display().to_string(),
        manifest,
        entries,
        configured_model,
        embedding_backend: config.embedding.backend.to_string(),
        model_matches,
        sources,
        ocr_available: TesseractOcr::new(&config.ocr).check_available(),
        llm_model: config.llm.model.clone(),
        api_key_set: config.llm.api_key().is_ok(),
    };

    print!("{}", formatter.format_status(&status));
    Ok(())
}
