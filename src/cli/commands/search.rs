use anyhow::Result;
use clap::Args;

use super::build_retriever;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long = "top-k", short = 'k', help = "Number of chunks to retrieve")]
    pub top_k: Option<u32>,
}

pub async fn handle_search(
    args: SearchArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let formatter = get_formatter(format);
    let retriever = build_retriever(config, args.top_k)?;

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Top-k: {}", retriever.top_k());
    }

    let result = retriever.retrieve(query).await?;
    print!("{}", formatter.format_retrieval(&result));

    Ok(())
}
