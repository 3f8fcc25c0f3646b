pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use cli::{Cli, Commands};
pub use models::{Config, OutputFormat};
pub use services::{QueryPipeline, Retriever, run_ingestion};
