mod api;
mod cli;
mod model;
mod orchestrator;
#[cfg(test)]
mod test_support;
mod text_summary;
mod timestamp;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("exec-dashboard")
        .join("exec-dashboard.log")
}

/// Headless modes log to stderr; the TUI owns the terminal, so it logs to a file.
fn init_tracing(args: &cli::Cli) -> Result<()> {
    let to_file = args.log_file.clone().or_else(|| {
        (!args.is_headless() && cfg!(feature = "tui")).then(default_log_file)
    });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match to_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();
    init_tracing(&args)?;

    match cli::run(args).await {
        Ok(()) => {
            // Exit explicitly so lingering opener children or blocking reads do not hold the process.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            let detail = format!("{e:#}");
            tracing::error!(error = %detail, "exec-dashboard failed");
            Err(e)
        }
    }
}
