//! Utility functions for slugs, URL handling, date prefixes and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Filename slugs and the URL-hash fallback used when a title slugs to nothing
//! - URL list loading for `--from-file`
//! - String truncation for logging
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Longest slug kept before trailing separators are stripped.
pub const SLUG_MAX_LEN: usize = 80;

static SLUG_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s\-_.]").expect("valid slug regex"));
static SLUG_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

/// Convert a title to a filename-safe slug.
///
/// Lowercases, drops everything except ASCII letters, digits, whitespace,
/// `-`, `_` and `.`, and turns whitespace runs into a single `-`. The result
/// is cut to [`SLUG_MAX_LEN`] characters with trailing `-`/`_` removed.
///
/// Returns an empty string when nothing usable survives; callers fall back
/// to [`url_hash`] in that case.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("!!!"), "");
/// ```
pub fn slugify_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let dashed = SLUG_SPACE.replace_all(&stripped, "-");
    let mut slug = dashed.into_owned();
    // Only ASCII survives the strip, so byte truncation is safe.
    slug.truncate(SLUG_MAX_LEN);
    slug.trim_end_matches(['-', '_']).to_string()
}

/// Short deterministic hash of a URL: the first 10 hex chars of its SHA-256.
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(10);
    hex
}

/// Host component of a URL, if it parses and has one.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Parse an opportunistic date string into a `YYYY-MM-DD` filename prefix.
///
/// Accepts RFC 3339, RFC 2822, bare `YYYY-MM-DD` and naive
/// `YYYY-MM-DDTHH:MM:SS[.f]`. Anything else yields `None`.
pub fn date_prefix(date: &str) -> Option<String> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    let day = if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        dt.date_naive()
    } else if let Ok(dt) = DateTime::parse_from_rfc2822(date) {
        dt.date_naive()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.date()
    } else if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        d
    } else {
        debug!(%date, "Unparseable date; no filename prefix");
        return None;
    };
    Some(day.format("%Y-%m-%d").to_string())
}

/// Parse newline-delimited URLs, skipping blank lines and `#` comments.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a URL list file (see [`parse_url_list`]).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_urls_from_file(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let contents = fs::read_to_string(path).await?;
    let urls = parse_url_list(&contents);
    info!(count = urls.len(), "Loaded URLs from file");
    Ok(urls)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a
/// probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
