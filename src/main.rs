use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fetchpool::cli::{commands, Cli};
use fetchpool::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries the results
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fetchpool=info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        let listed = commands::read_url_list(path)
            .with_context(|| format!("reading URL list from {}", path.display()))?;
        urls.extend(listed);
    }

    let summary = commands::fetch_urls(&config, urls).await?;
    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
