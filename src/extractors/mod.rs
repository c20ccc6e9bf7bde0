//! Extractor adapters that turn a fetched article page into a [`RawExtraction`].
//!
//! Each adapter follows the same contract: given a URL, fetch it and return
//! whatever structured content it can find, or `None`. Adapters never return
//! errors; network failures, timeouts, non-2xx responses and pages with
//! nothing usable are logged and become `None`, so one broken page can never
//! abort a batch.
//!
//! # Adapters
//!
//! | Adapter | Module | Strategy | Role |
//! |---------|--------|----------|------|
//! | Metadata | [`primary`] | JSON-LD, OpenGraph and meta tags; `<article>`/`<main>` paragraphs | Primary |
//! | Readability | `fallback` | Paragraph-density scoring; byline and `<time>` markup | Fallback, optional |
//!
//! # Normalization
//!
//! Both adapters:
//! - collapse a scalar author into a one-element list
//! - convert offset-carrying dates to UTC and pass naive dates through
//! - default `sitename` to the URL host

use crate::fetch::FetchPage;
use crate::models::RawExtraction;
use tracing::{debug, warn};

#[cfg(feature = "fallback")]
pub mod fallback;
pub mod html;
pub mod primary;

#[cfg(feature = "fallback")]
pub use fallback::ReadabilityExtractor;
pub use primary::MetadataExtractor;

/// Trait for a best-effort article extractor.
pub trait Extractor {
    /// Short adapter name used in logs.
    fn name(&self) -> &'static str;

    /// Extract structured content from `url`, or `None` when nothing usable came back.
    async fn extract(&self, url: &str) -> Option<RawExtraction>;
}

/// Fetch a page for an adapter, converting every failure into `None`.
pub(crate) async fn fetch_html<F: FetchPage>(
    fetcher: &F,
    url: &str,
    adapter: &'static str,
) -> Option<String> {
    match fetcher.fetch(url).await {
        Ok(body) if body.trim().is_empty() => {
            warn!(%url, adapter, "Fetched an empty page; no result");
            None
        }
        Ok(body) => {
            debug!(%url, adapter, bytes = body.len(), "Fetched page for extraction");
            Some(body)
        }
        Err(e) => {
            warn!(%url, adapter, error = %e, "Fetch failed; no result");
            None
        }
    }
}

/// Resolve the fallback capability once at startup.
///
/// Returns the fallback adapter when the `fallback` feature is compiled in and
/// `enabled` is set; the coalescer treats `None` as "fallback produced nothing".
#[cfg(feature = "fallback")]
pub fn fallback_extractor<F: FetchPage>(
    fetcher: F,
    enabled: bool,
) -> Option<ReadabilityExtractor<F>> {
    if enabled {
        tracing::info!("Fallback extractor available");
        Some(ReadabilityExtractor::new(fetcher))
    } else {
        tracing::info!("Fallback extractor disabled by configuration");
        None
    }
}

/// Fallback slot type when built without the `fallback` feature. Uninhabited.
#[cfg(not(feature = "fallback"))]
#[derive(Debug, Clone, Copy)]
pub enum NoFallback {}

#[cfg(not(feature = "fallback"))]
impl Extractor for NoFallback {
    fn name(&self) -> &'static str {
        match *self {}
    }

    async fn extract(&self, _url: &str) -> Option<RawExtraction> {
        match *self {}
    }
}

/// Resolve the fallback capability (always `None` without the `fallback` feature).
#[cfg(not(feature = "fallback"))]
pub fn fallback_extractor<F: FetchPage>(_fetcher: F, _enabled: bool) -> Option<NoFallback> {
    tracing::info!("Built without the fallback extractor");
    None
}
