use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{IngestOptions, create_embedder, run_ingestion};
use crate::sources::TesseractOcr;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(
        long,
        help = "Delete the existing vector store first (required after changing the embedding model)"
    )]
    pub reset: bool,
}

pub async fn handle_ingest(
    args: IngestArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    let ocr = TesseractOcr::new(&config.ocr);
    if !ocr.check_available() {
        tracing::warn!(
            command = %config.ocr.command,
            "OCR engine unavailable; images will be skipped. {}",
            ocr.install_instructions()
        );
    }

    let embedder =
        create_embedder(&config.embedding).context("failed to initialise embedding model")?;

    let options = IngestOptions {
        reset: args.reset,
        show_progress: format == OutputFormat::Text && !verbose,
    };

    let report = run_ingestion(config, embedder.as_ref(), Arc::new(ocr), &options)
        .await
        .context("ingestion failed")?;

    print!("{}", formatter.format_ingestion_report(&report));
    Ok(())
}
