//! Data models for extracted articles and their archived representation.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawExtraction`]: Best-effort output of a single extractor adapter
//! - [`ArticleDraft`]: Coalesced result plus where it came from
//! - [`ArticleRecord`]: The finalized, immutable record handed to the sinks
//!
//! Adapters fill a [`RawExtraction`] with whatever they managed to find; the
//! coalescer decides which one wins and the finalizer turns the winner into
//! an [`ArticleRecord`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a single extractor adapter managed to pull out of a page.
///
/// Every field is optional. Adapters trim strings and store blanks as `None`,
/// so `Some` always means "has content".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtraction {
    /// Headline of the article.
    pub title: Option<String>,
    /// Bylines in page order. A single scalar author is stored as a one-element list.
    pub authors: Option<Vec<String>>,
    /// ISO-8601 publication date or timestamp.
    pub date: Option<String>,
    /// Extracted body text.
    pub text: Option<String>,
    /// Human-readable site name, or the URL host.
    pub sitename: Option<String>,
}

impl RawExtraction {
    /// Both a headline and a body were found.
    pub fn is_sufficient(&self) -> bool {
        non_empty(&self.title) && non_empty(&self.text)
    }

    /// Anything beyond a site name was found.
    ///
    /// The site name alone does not count: adapters can always derive it
    /// from the URL host.
    pub fn has_content(&self) -> bool {
        non_empty(&self.title) || non_empty(&self.text) || non_empty(&self.date) || self.has_authors()
    }

    pub fn has_authors(&self) -> bool {
        self.authors.as_ref().is_some_and(|a| !a.is_empty())
    }
}

pub(crate) fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// Which path through the coalescer produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Primary adapter output, sufficient or best-effort.
    Primary,
    /// Fallback adapter output, possibly back-filled from the primary.
    Fallback,
    /// Neither adapter returned anything.
    Stub,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Primary => "primary",
            Origin::Fallback => "fallback",
            Origin::Stub => "stub",
        };
        f.write_str(s)
    }
}

/// Coalescer output, before finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub url: String,
    pub fields: RawExtraction,
    pub origin: Origin,
}

impl ArticleDraft {
    pub fn stub(url: &str) -> Self {
        Self {
            url: url.to_string(),
            fields: RawExtraction::default(),
            origin: Origin::Stub,
        }
    }
}

/// A finalized article, as written to the Markdown document and both catalogs.
///
/// Optional fields that are `None` are left out of the JSONL catalog entirely,
/// so a stub serializes as `{"url": ..., "authors": []}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Source URL; also the dedup key within a run.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Always a list, possibly empty.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Opportunistic ISO-8601 metadata; consumers may fail to parse it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitename: Option<String>,
}

/// How much of an article was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Title and body both present.
    Successful,
    /// Some content, but not both title and body.
    Partial,
    /// Only the URL.
    Empty,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Successful => "successful",
            RecordStatus::Partial => "partial",
            RecordStatus::Empty => "empty",
        };
        f.write_str(s)
    }
}

impl ArticleRecord {
    pub fn status(&self) -> RecordStatus {
        if non_empty(&self.title) && non_empty(&self.text) {
            RecordStatus::Successful
        } else if non_empty(&self.title)
            || non_empty(&self.text)
            || non_empty(&self.date)
            || non_empty(&self.sitename)
            || !self.authors.is_empty()
        {
            RecordStatus::Partial
        } else {
            RecordStatus::Empty
        }
    }

    /// The URL host, e.g. `"www.example.com"`.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}
