use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use super::build_retriever;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{GeminiClient, QueryPipeline};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question for the advisor")]
    pub question: String,

    #[arg(long = "top-k", short = 'k', help = "Number of context chunks")]
    pub top_k: Option<u32>,
}

pub async fn handle_ask(
    args: AskArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let formatter = get_formatter(format);
    let llm = GeminiClient::new(&config.llm).context("failed to configure LLM client")?;
    let retriever = build_retriever(config, args.top_k)?;
    let pipeline = QueryPipeline::new(retriever, Arc::new(llm), &config.retrieval)?;

    let result = pipeline.retriever().retrieve(question).await?;
    if verbose {
        eprintln!("Context ({} chunks):", result.len());
        for hit in &result.hits {
            eprintln!(
                "  {}. {} [{:.3}]",
                hit.rank, hit.entry.chunk.source_id, hit.score
            );
        }
    }

    let answer = pipeline.answer(question, &result).await?;
    print!("{}", formatter.format_answer(question, &answer));

    Ok(())
}
