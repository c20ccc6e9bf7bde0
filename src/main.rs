//! # Awful News Archive
//!
//! Fetches news article URLs, extracts title, byline, date and body, and
//! archives each article as a Markdown document plus a line in JSONL and CSV
//! catalogs.
//!
//! ## Features
//!
//! - Precision-first metadata extraction (JSON-LD, OpenGraph, `<article>`)
//! - Readability-style fallback when the headline or body is missing
//! - Field-level back-fill of date, authors and site name from the primary result
//! - Advisory robots.txt checks that fail open
//! - Polite, sequential fetching with a configurable delay
//!
//! ## Usage
//!
//! ```sh
//! awful_news_archive https://example.com/story -f more_urls.txt --delay 1.5
//! ```
//!
//! ## Architecture
//!
//! Each URL runs through the same pipeline, one at a time:
//! 1. **Gate**: Consult robots.txt for the URL's origin (unless `--skip-robots`)
//! 2. **Extract**: Primary adapter, then the fallback when the result is insufficient
//! 3. **Finalize**: Normalize into an [`models::ArticleRecord`]
//! 4. **Persist**: Markdown document, JSONL line, CSV row
//!
//! ## Exit codes
//!
//! - `0`: every URL was persisted (or skipped by robots.txt)
//! - `1`: at least one record failed to persist, or startup failed
//! - `2`: no URLs were given

use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod coalesce;
mod extractors;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod robots;
mod utils;

use cli::Cli;
use coalesce::Coalescer;
use extractors::{MetadataExtractor, fallback_extractor};
use fetch::HttpFetcher;
use outputs::ArchiveSink;
use pipeline::Pipeline;
use robots::RobotsGate;
use utils::{ensure_writable_dir, read_urls_from_file};

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_news_archive starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    let config = args.run_config();

    // ---- Collect URLs ----
    let mut urls = args.urls.clone();
    if let Some(path) = &args.from_file {
        match read_urls_from_file(path).await {
            Ok(from_file) => urls.extend(from_file),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read URL file");
                return Err(e.into());
            }
        }
    }
    let given = urls.len();
    let urls: Vec<String> = urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unique()
        .collect();
    if urls.len() < given {
        info!(duplicates = given - urls.len(), "Dropped duplicate URLs");
    }
    if urls.is_empty() {
        error!("No URLs provided; pass URLs as arguments or use --from-file");
        return Ok(ExitCode::from(2));
    }

    // Early check: ensure the Markdown output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Wire the pipeline ----
    let fetcher = HttpFetcher::new(config.timeout)?;
    let coalescer = Coalescer::new(
        MetadataExtractor::new(fetcher.clone()),
        fallback_extractor(fetcher.clone(), config.use_fallback),
    );
    let gate = if config.respect_robots {
        Some(RobotsGate::new(fetcher.clone()))
    } else {
        warn!("robots.txt checks disabled");
        None
    };
    let sink = ArchiveSink::new(
        args.output_dir.clone(),
        PathBuf::from(&args.jsonl),
        PathBuf::from(&args.csv),
    );
    let pipeline = Pipeline::new(coalescer, gate, sink, &config);
    info!(
        count = urls.len(),
        delay_secs = config.delay.as_secs_f64(),
        timeout_secs = config.timeout.as_secs_f64(),
        fallback = config.use_fallback,
        robots = config.respect_robots,
        "Starting batch"
    );

    // ---- Ctrl-C stops the batch at the next pause ----
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing current URL");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = pipeline.run(&urls, shutdown_rx).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        persisted = summary.persisted(),
        successful = summary.successful,
        partial = summary.partial,
        empty = summary.empty,
        skipped = summary.skipped,
        failed = summary.failed,
        "Execution complete"
    );

    if summary.failed > 0 {
        error!(failed = summary.failed, "Some records could not be saved");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
