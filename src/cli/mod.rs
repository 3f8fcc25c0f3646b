//! Command-line interface for the CropSense advisor.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Agricultural advisor: ingest farming documents and answer questions over them.
#[derive(Debug, Parser)]
#[command(name = "cropsense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "CROPSENSE_CONFIG",
        help = "Path to config.toml"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load PDFs, CSVs and images into the vector store
    Ingest(commands::IngestArgs),

    /// Ask a question answered from the ingested documents
    Ask(commands::AskArgs),

    /// Show the chunks most similar to a query
    Search(commands::SearchArgs),

    /// Show vector store, model and source status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
