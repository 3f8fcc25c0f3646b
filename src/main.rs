use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cropsense::cli::commands::{
    handle_ask, handle_config, handle_ingest, handle_search, handle_status, load_config,
};
use cropsense::cli::{Cli, Commands};
use cropsense::models::OutputFormat;

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/cropsense/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/cropsense/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "cropsense=debug"
    } else {
        "cropsense=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    detect_and_set_ort_path();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format.unwrap_or_default();
    let verbose = cli.verbose;

    tokio::select! {
        result = run_command(cli.command, cli.config.as_deref(), format, verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, cleaning up...");
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }

    Ok(())
}

async fn run_command(
    command: Commands,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Ingest(args) => {
            let config = load_config(config_path)?;
            handle_ingest(args, &config, format, verbose).await?;
        }
        Commands::Ask(args) => {
            let config = load_config(config_path)?;
            handle_ask(args, &config, format, verbose).await?;
        }
        Commands::Search(args) => {
            let config = load_config(config_path)?;
            handle_search(args, &config, format, verbose).await?;
        }
        Commands::Status => {
            let config = load_config(config_path)?;
            handle_status(&config, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, config_path, format).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
