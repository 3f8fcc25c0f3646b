//! Ingestion pipeline: load sources, chunk, embed and persist.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{EmbeddingError, IngestError};
use crate::models::{Chunk, Config, DocumentKind, IngestionReport, SourceDocument, VectorStoreEntry};
use crate::services::{Embedder, TextChunker, VectorStore};
use crate::sources::{
    CsvLoader, DirectoryScan, DocumentLoader, ImageLoader, OcrEngine, PdfLoader, scan_directory,
};

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Drop existing entries (and the manifest) before writing.
    pub reset: bool,
    /// Draw a progress bar on stderr while embedding.
    pub show_progress: bool,
}

/// Run one ingestion pass over the configured source directories.
///
/// Unreadable files are logged and skipped. Fails with
/// [`IngestError::EmptyCorpus`] before anything is embedded or written when
/// no source produced a document.
pub async fn run_ingestion(
    config: &Config,
    embedder: &dyn Embedder,
    ocr: Arc<dyn OcrEngine>,
    options: &IngestOptions,
) -> Result<IngestionReport, IngestError> {
    config.validate()?;
    let start = Instant::now();

    let mut report = IngestionReport {
        embedding_model: embedder.model_id().to_string(),
        store_path: config.vector_store.path.display().to_string(),
        ..Default::default()
    };

    let loaders: [(&Path, Box<dyn DocumentLoader>); 3] = [
        (config.sources.pdf_dir.as_path(), Box::new(PdfLoader::new())),
        (config.sources.csv_dir.as_path(), Box::new(CsvLoader::new())),
        (config.sources.image_dir.as_path(), Box::new(ImageLoader::new(ocr))),
    ];

    let mut documents = Vec::new();
    for (dir, loader) in &loaders {
        documents.extend(load_source(dir, loader.as_ref(), &mut report));
    }

    if documents.is_empty() {
        tracing::error!(
            files_skipped = report.files_skipped(),
            "no documents produced; aborting ingestion"
        );
        return Err(IngestError::EmptyCorpus);
    }

    let chunker = TextChunker::new(&config.chunking);
    let chunks = chunker.chunk_all(&documents);
    report.chunks_created = chunks.len() as u64;
    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size = chunker.chunk_size(),
        overlap = chunker.overlap(),
        "chunked documents"
    );

    // A reset only replaces the store once every chunk has been embedded, so a
    // failing embedder leaves the previous index intact.
    let store_path = &config.vector_store.path;
    let existing = if options.reset {
        None
    } else {
        Some(VectorStore::open(store_path, embedder.model_id(), embedder.dimension())?)
    };

    let pb = if options.show_progress {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let batch_size = config.embedding.batch_size as usize;
    let mut entries = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
        let embedded = match embed_batch(embedder, batch).await {
            Ok(embedded) => embedded,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };
        entries.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let store = match existing {
        Some(store) => store,
        None => VectorStore::recreate(store_path, embedder.model_id(), embedder.dimension())?,
    };
    report.entries_stored = store.upsert(&entries)? as u64;

    report.duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        files_loaded = report.files_loaded(),
        files_skipped = report.files_skipped(),
        documents = report.documents_loaded(),
        entries = report.entries_stored,
        duration_ms = report.duration_ms,
        "ingestion complete"
    );

    Ok(report)
}

/// Load every accepted file in `dir`, recording counts in `report`.
fn load_source(
    dir: &Path,
    loader: &dyn DocumentLoader,
    report: &mut IngestionReport,
) -> Vec<SourceDocument> {
    let kind = loader.kind();

    let files = match scan_directory(dir, loader) {
        DirectoryScan::Unavailable(reason) => {
            tracing::info!(source = loader.name(), %reason, "source directory unavailable; skipping");
            report.stats_mut(kind).unavailable = true;
            return Vec::new();
        }
        DirectoryScan::Files(files) => files,
    };

    let mut documents = Vec::new();
    for path in files {
        report.stats_mut(kind).files_scanned += 1;

        match loader.load(&path) {
            Ok(docs) => {
                if docs.is_empty() && kind == DocumentKind::ImageOcr {
                    report.images_without_text += 1;
                }
                tracing::debug!(file = %path.display(), documents = docs.len(), "loaded");

                let stats = report.stats_mut(kind);
                stats.files_loaded += 1;
                stats.documents += docs.len() as u64;
                documents.extend(docs);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), source = loader.name(), error = %e, "skipping file");
                report.stats_mut(kind).files_skipped += 1;
            }
        }
    }

    let stats = report.stats(kind);
    tracing::info!(
        source = loader.name(),
        loaded = stats.files_loaded,
        skipped = stats.files_skipped,
        documents = stats.documents,
        "loaded source directory"
    );

    documents
}

/// Embed one batch of chunks, pairing each chunk with its vector.
async fn embed_batch(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
) -> Result<Vec<VectorStoreEntry>, IngestError> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_documents(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        ))
        .into());
    }

    Ok(chunks
        .iter()
        .cloned()
        .zip(embeddings)
        .map(|(chunk, embedding)| VectorStoreEntry::new(chunk, embedding))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorStoreError;
    use async_trait::async_trait;
    use crate::services::{HashingEmbedder, QueryPipeline, Retriever};
    use crate::test_support::{
        RecordingLlm, ScriptedOcr, test_config, write_blank_image, write_test_pdf,
    };
    use std::fs;

    const DIM: usize = 384;

    fn ocr(text: &str) -> Arc<dyn OcrEngine> {
        Arc::new(ScriptedOcr::new(text))
    }

    /// Embedder that times out on every call.
    struct UnreachableEmbedder;

    #[async_trait]
    impl Embedder for UnreachableEmbedder {
        fn model_id(&self) -> &str {
            HashingEmbedder::MODEL_ID
        }

        fn dimension(&self) -> usize {
            DIM
        }

        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Timeout)
        }
    }

    /// Embedder that returns one vector fewer than it was given.
    struct ShortEmbedder(HashingEmbedder);

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_id(&self) -> &str {
            self.0.model_id()
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut vectors = self.0.embed_documents(texts).await?;
            vectors.pop();
            Ok(vectors)
        }
    }

    fn write_prices(config: &Config) {
        fs::create_dir_all(&config.sources.csv_dir).unwrap();
        fs::write(
            config.sources.csv_dir.join("prices.csv"),
            "Commodity,Price\nOnion,1500\nWheat,2400\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_pdf_roundtrip_top_hit() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.pdf_dir).unwrap();
        write_test_pdf(
            &config.sources.pdf_dir.join("wheat_guide.pdf"),
            &[
                "Leaf rust of wheat is controlled by spraying propiconazole at first sign",
                "Onion bulbs should be cured in shade for ten days before storage",
            ],
        );

        let embedder = HashingEmbedder::new(DIM);
        let report = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.pdf.files_loaded, 1);
        assert_eq!(report.pdf.documents, 2);
        assert!(report.csv.unavailable);
        assert!(report.image.unavailable);
        assert_eq!(report.entries_stored, report.chunks_created);
        assert_eq!(report.embedding_model, HashingEmbedder::MODEL_ID);

        let store =
            Arc::new(VectorStore::open(&config.vector_store.path, HashingEmbedder::MODEL_ID, DIM).unwrap());
        let retriever = Retriever::new(Arc::new(embedder), store, 1).unwrap();
        let result = retriever
            .retrieve("how to control leaf rust of wheat")
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let top = &result.hits[0].entry.chunk;
        assert_eq!(top.source_id, "wheat_guide.pdf");
        assert!(top.text.contains("propiconazole"));
    }

    #[tokio::test]
    async fn test_csv_missing_price_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.csv_dir).unwrap();
        fs::write(
            config.sources.csv_dir.join("mandi.csv"),
            "Commodity,Price\nOnion,\n",
        )
        .unwrap();

        let embedder = HashingEmbedder::new(DIM);
        let report = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(report.csv.documents, 1);
        assert_eq!(report.entries_stored, 1);

        let store =
            Arc::new(VectorStore::open(&config.vector_store.path, HashingEmbedder::MODEL_ID, DIM).unwrap());
        let retriever = Retriever::new(Arc::new(embedder), store, 4).unwrap();
        let result = retriever.retrieve("onion price").await.unwrap();

        assert_eq!(result.hits[0].entry.chunk.text, "Commodity: Onion, Price: N/A");
        assert!(!result.hits[0].entry.chunk.text.to_lowercase().contains("nan"));
    }

    #[tokio::test]
    async fn test_blank_image_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.image_dir).unwrap();
        fs::create_dir_all(&config.sources.csv_dir).unwrap();
        write_blank_image(&config.sources.image_dir.join("blank.png"));
        fs::write(config.sources.csv_dir.join("a.csv"), "Crop\nWheat\n").unwrap();

        let embedder = HashingEmbedder::new(DIM);
        let report = run_ingestion(&config, &embedder, ocr(" \n "), &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.images_without_text, 1);
        assert_eq!(report.image.documents, 0);
        assert_eq!(report.image.files_skipped, 0);
        assert_eq!(report.entries_stored, 1);
    }

    #[tokio::test]
    async fn test_empty_corpus_aborts_before_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.image_dir).unwrap();
        write_blank_image(&config.sources.image_dir.join("blank.png"));

        let embedder = HashingEmbedder::new(DIM);
        let result = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default()).await;

        assert!(matches!(result, Err(IngestError::EmptyCorpus)));
        assert!(!config.vector_store.path.exists());
    }

    #[tokio::test]
    async fn test_all_directories_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let embedder = HashingEmbedder::new(DIM);
        let result = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default()).await;

        assert!(matches!(result, Err(IngestError::EmptyCorpus)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.pdf_dir).unwrap();
        fs::write(config.sources.pdf_dir.join("broken.pdf"), b"%PDF-1.4 garbage").unwrap();
        write_test_pdf(&config.sources.pdf_dir.join("good.pdf"), &["Sow mustard in October"]);

        let embedder = HashingEmbedder::new(DIM);
        let report = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.pdf.files_scanned, 2);
        assert_eq!(report.pdf.files_loaded, 1);
        assert_eq!(report.pdf.files_skipped, 1);
        assert_eq!(report.files_skipped(), 1);
    }

    #[tokio::test]
    async fn test_reingest_appends_and_reset_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.csv_dir).unwrap();
        fs::write(
            config.sources.csv_dir.join("prices.csv"),
            "Commodity,Price\nOnion,1500\nWheat,2400\n",
        )
        .unwrap();
        let embedder = HashingEmbedder::new(DIM);

        run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default())
            .await
            .unwrap();
        run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default())
            .await
            .unwrap();
        let store = VectorStore::open_existing(&config.vector_store.path).unwrap();
        assert_eq!(store.len().unwrap(), 4);
        drop(store);

        let options = IngestOptions {
            reset: true,
            ..Default::default()
        };
        run_ingestion(&config, &embedder, ocr(""), &options).await.unwrap();
        let store = VectorStore::open_existing(&config.vector_store.path).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_prices(&config);

        run_ingestion(&config, &HashingEmbedder::new(DIM), ocr(""), &IngestOptions::default())
            .await
            .unwrap();

        let options = IngestOptions {
            reset: true,
            ..Default::default()
        };
        let result = run_ingestion(&config, &UnreachableEmbedder, ocr(""), &options).await;
        assert!(matches!(
            result,
            Err(IngestError::EmbeddingError(EmbeddingError::Timeout))
        ));

        let store = VectorStore::open_existing(&config.vector_store.path).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.manifest().embedding_model, HashingEmbedder::MODEL_ID);
    }

    #[tokio::test]
    async fn test_failed_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_prices(&config);

        run_ingestion(&config, &HashingEmbedder::new(DIM), ocr(""), &IngestOptions::default())
            .await
            .unwrap();
        let result =
            run_ingestion(&config, &UnreachableEmbedder, ocr(""), &IngestOptions::default()).await;
        assert!(result.is_err());

        let store = VectorStore::open_existing(&config.vector_store.path).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_short_embedding_response_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_prices(&config);

        let embedder = ShortEmbedder(HashingEmbedder::new(DIM));
        let result = run_ingestion(&config, &embedder, ocr(""), &IngestOptions::default()).await;

        assert!(matches!(
            result,
            Err(IngestError::EmbeddingError(EmbeddingError::InvalidResponse(_)))
        ));
        let store = VectorStore::open_existing(&config.vector_store.path).unwrap();
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_model_change_requires_reset() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.csv_dir).unwrap();
        fs::write(config.sources.csv_dir.join("a.csv"), "Crop\nRice\n").unwrap();

        run_ingestion(&config, &HashingEmbedder::new(DIM), ocr(""), &IngestOptions::default())
            .await
            .unwrap();
        let result = run_ingestion(
            &config,
            &HashingEmbedder::new(128),
            ocr(""),
            &IngestOptions::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(IngestError::VectorStoreError(VectorStoreError::DimensionMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.sources.image_dir).unwrap();
        write_blank_image(&config.sources.image_dir.join("label.png"));

        let embedder = HashingEmbedder::new(DIM);
        run_ingestion(
            &config,
            &embedder,
            ocr("Yellow rust appears as stripes on wheat leaves"),
            &IngestOptions::default(),
        )
        .await
        .unwrap();

        let store =
            Arc::new(VectorStore::open(&config.vector_store.path, HashingEmbedder::MODEL_ID, DIM).unwrap());
        let retriever = Retriever::new(Arc::new(embedder), store, 4).unwrap();
        let llm = Arc::new(RecordingLlm::new("Use a triazole fungicide."));
        let pipeline = QueryPipeline::new(retriever, llm.clone(), &config.retrieval).unwrap();

        let answer = pipeline.ask("What does yellow rust look like?").await.unwrap();

        assert_eq!(answer, "Use a triazole fungicide.");
        assert!(llm.prompts()[0].contains("Yellow rust appears as stripes on wheat leaves"));
    }
}
