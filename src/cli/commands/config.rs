use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::load_config;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
}

pub async fn handle_config(
    cmd: ConfigCommand,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show => handle_show(config_path, format),
        ConfigCommand::Path => handle_path(config_path),
        ConfigCommand::Init { force } => handle_init(config_path, force, format),
    }
}

fn resolve_path(config_path: Option<&Path>) -> Result<PathBuf> {
    config_path
        .map(Path::to_path_buf)
        .or_else(Config::config_path)
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))
}

fn handle_show(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn handle_path(config_path: Option<&Path>) -> Result<()> {
    let path = resolve_path(config_path)?;
    if path.exists() {
        println!("{} (active)", path.display());
    } else {
        println!("{} (not created; using defaults)", path.display());
    }
    Ok(())
}

fn handle_init(config_path: Option<&Path>, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let path = resolve_path(config_path)?;

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save_to(&path)
        .context("failed to write config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}
