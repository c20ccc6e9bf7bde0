//! Command-line interface definitions for Awful News Archive.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Output location, delay and timeout can also come from environment variables.

use crate::pipeline::RunConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Request timeout used when `--timeout` is zero, negative or not a number.
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Command-line arguments for the Awful News Archive application.
///
/// URLs come from positional arguments, a `--from-file` list, or both.
///
/// # Examples
///
/// ```sh
/// # Archive two articles into ./articles with the default catalogs
/// awful_news_archive https://example.com/a https://example.com/b
///
/// # Read URLs from a file, no delay, no robots.txt checks
/// awful_news_archive -f urls.txt --delay 0 --skip-robots
///
/// # Markdown only, no catalogs
/// awful_news_archive --jsonl '' --csv '' https://example.com/a
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URLs to archive
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and `#` comments ignored)
    #[arg(short = 'f', long)]
    pub from_file: Option<PathBuf>,

    /// Directory for the per-article Markdown files
    #[arg(short, long, env = "ARCHIVE_OUTPUT_DIR", default_value = "./articles")]
    pub output_dir: PathBuf,

    /// JSONL catalog path (empty to disable)
    #[arg(long, default_value = "./catalog.jsonl")]
    pub jsonl: String,

    /// CSV catalog path (empty to disable)
    #[arg(long, default_value = "./catalog.csv")]
    pub csv: String,

    /// Seconds to wait between URLs
    #[arg(short, long, env = "ARCHIVE_DELAY", default_value_t = 2.0, allow_negative_numbers = true)]
    pub delay: f64,

    /// Per-request timeout in seconds
    #[arg(short, long, env = "ARCHIVE_TIMEOUT", default_value_t = 20.0)]
    pub timeout: f64,

    /// Do not consult robots.txt before fetching
    #[arg(long)]
    pub skip_robots: bool,

    /// Never run the fallback extractor
    #[arg(long)]
    pub no_fallback: bool,

    /// Abort the batch on the first persistence failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl Cli {
    /// Pipeline settings with delay clamped to zero and timeout defaulted.
    pub fn run_config(&self) -> RunConfig {
        let delay = Duration::try_from_secs_f64(self.delay).unwrap_or(Duration::ZERO);
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        RunConfig {
            delay,
            timeout,
            respect_robots: !self.skip_robots,
            use_fallback: !self.no_fallback,
            fail_fast: self.fail_fast,
        }
    }
}
