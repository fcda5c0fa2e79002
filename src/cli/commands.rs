use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::app::Result;
use crate::config::{Config, OutputConfig, OutputFormat};
use crate::domain::FetchResponse;
use crate::pool::FetchPool;

#[derive(Debug, Default)]
struct Tally {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Fetch `urls` through a pool built from `config`, printing each response as
/// it completes.
pub async fn fetch_urls(config: &Config, urls: Vec<String>) -> Result<BatchSummary> {
    if urls.is_empty() {
        println!("No URLs to fetch");
        return Ok(BatchSummary {
            completed: 0,
            failed: 0,
        });
    }

    let tally = Arc::new(Tally::default());
    let output = config.output.clone();

    let pool = {
        let tally = tally.clone();
        FetchPool::new(config.pool.clone(), move |response| {
            tally.completed.fetch_add(1, Ordering::SeqCst);
            if !response.is_success() {
                tally.failed.fetch_add(1, Ordering::SeqCst);
            }
            println!("{}", render(&response, &output));
        })?
    };

    pool.start()?;
    tracing::info!(urls = urls.len(), "submitting batch");
    pool.submit(urls).await?;
    pool.wait().await;
    pool.shutdown().await;

    let summary = BatchSummary {
        completed: tally.completed.load(Ordering::SeqCst),
        failed: tally.failed.load(Ordering::SeqCst),
    };
    eprintln!(
        "Fetch complete: {} responses, {} failed",
        summary.completed, summary.failed
    );
    Ok(summary)
}

/// Read URLs from `path`, or stdin for `-`. Blank lines and `#` comments are
/// skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    if path == Path::new("-") {
        return Ok(parse_url_list(io::stdin().lock())?);
    }
    let file = std::fs::File::open(path)?;
    Ok(parse_url_list(BufReader::new(file))?)
}

fn parse_url_list(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(line.to_string());
    }
    Ok(urls)
}

pub fn render(response: &FetchResponse, output: &OutputConfig) -> String {
    match output.format {
        OutputFormat::Text => render_text(response),
        OutputFormat::Json => render_json(response, output.include_body).to_string(),
    }
}

fn render_text(response: &FetchResponse) -> String {
    let ip = if response.ip.is_empty() { "-" } else { &response.ip };
    let mut line = format!(
        "{:>3} {:>9.1}ms {:<15} {}",
        response.response_code,
        response.duration_ms(),
        ip,
        response.target_url
    );
    if !response.final_url.is_empty() {
        line.push_str(" -> ");
        line.push_str(&response.final_url);
    }
    if let Some(failure) = response.failure() {
        line.push_str(&format!(" ({}: {})", failure.kind, failure.message));
    }
    line
}

fn render_json(response: &FetchResponse, include_body: bool) -> Value {
    let mut value = serde_json::to_value(response).unwrap_or(Value::Null);
    if include_body {
        if let Value::Object(map) = &mut value {
            map.insert(
                "body".to_string(),
                Value::String(String::from_utf8_lossy(&response.body).into_owned()),
            );
        }
    }
    value
}
