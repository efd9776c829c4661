//! cartograph-runner: translate payloads described by TOML job files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cartograph-runner",
    version,
    about = "Translate payloads between versioned schemas using template job files"
)]
struct Cli {
    /// Job configuration files (TOML); each runs on its own worker thread.
    #[arg(required = true, value_name = "JOB_FILE")]
    jobs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    cartograph::cli::run(&cli.jobs)
}
