mod app;
mod assets;
mod cache;
mod config;
mod input;
mod model;
mod motion;
mod render;
mod sim;
mod sleep;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let paths = config::project_paths()?;
    let log_path = cli.log.clone().unwrap_or_else(|| paths.log_path.clone());
    init_tracing(&log_path)?;
    tracing::info!(log = %log_path.display(), "retropet starting");

    app::run(|settings| settings.with_cli(&cli), paths)
}

/// The terminal is in raw alternate-screen mode, so logs go to a file.
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}
