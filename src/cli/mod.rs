pub mod commands;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "fetchpool")]
#[command(about = "Fetch many URLs concurrently and report status, timing and address", long_about = None)]
pub struct Cli {
    /// URLs to fetch
    pub urls: Vec<String>,

    /// Read URLs from a file, one per line ("-" for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Number of parallel fetch workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Path to a config file (default: ~/.config/fetchpool/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print one JSON object per response
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Command-line flags take precedence over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.pool.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.pool.timeout_secs = timeout;
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
    }
}
