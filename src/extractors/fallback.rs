//! Fallback, readability-style extractor.
//!
//! Ignores declared metadata for the body and instead looks at the markup:
//! every paragraph of a reasonable length scores its parent container (and
//! half that for the grandparent); the best-scoring container supplies the
//! body. Headline comes from the first `<h1>` or a cleaned `<title>`, bylines
//! from common byline markup, and the date from article meta or `<time>`.
//!
//! Dates carrying an offset are reported as a full UTC timestamp. The site
//! name is always the URL host.

use super::html::{
    clean_text, document_title, element_text, first_text, in_boilerplate, meta_content,
    parse_page_date, scalar_author, sel,
};
use super::{Extractor, fetch_html};
use crate::fetch::FetchPage;
use crate::models::RawExtraction;
use crate::utils::host_of;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

static H1: Lazy<Selector> = Lazy::new(|| sel("h1"));
static P: Lazy<Selector> = Lazy::new(|| sel("p"));
static TIME: Lazy<Selector> = Lazy::new(|| sel("time[datetime]"));
static BYLINES: Lazy<Selector> = Lazy::new(|| {
    sel(r#"[rel="author"], [itemprop="author"] [itemprop="name"], [itemprop="author"], .byline, .byline-name, .author-name, .author"#)
});
static BY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*by\s+").expect("valid byline regex"));
static AUTHOR_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:,|&|\band\b)\s*").expect("valid author split regex"));

/// Paragraphs shorter than this do not contribute to a container's score.
const MIN_SCORING_PARAGRAPH: usize = 25;
/// Longest string accepted as a single author name.
const MAX_AUTHOR_LEN: usize = 80;

const DATE_META: &[&str] = &[
    "article:published_time",
    "pubdate",
    "publishdate",
    "datePublished",
    "date",
];

/// Readability-style adapter scoring containers by paragraph density.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor<F> {
    fetcher: F,
}

impl<F: FetchPage> ReadabilityExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: FetchPage> Extractor for ReadabilityExtractor<F> {
    fn name(&self) -> &'static str {
        "readability"
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn extract(&self, url: &str) -> Option<RawExtraction> {
        let html = fetch_html(&self.fetcher, url, self.name()).await?;
        let extraction = parse_page(url, &html);
        match &extraction {
            Some(raw) => info!(
                title = raw.title.is_some(),
                text_bytes = raw.text.as_ref().map_or(0, String::len),
                sufficient = raw.is_sufficient(),
                "Readability extraction finished"
            ),
            None => info!("Readability extraction found nothing"),
        }
        extraction
    }
}

/// Extract from an already fetched page.
pub fn parse_page(url: &str, html: &str) -> Option<RawExtraction> {
    let document = Html::parse_document(html);

    let title = first_text(&document, &H1)
        .or_else(|| document_title(&document).map(|t| strip_site_suffix(&t)))
        .or_else(|| meta_content(&document, &["og:title"]));

    let authors = byline_authors(&document)
        .or_else(|| meta_content(&document, &["author"]).and_then(|a| scalar_author(&a)));

    let date = meta_content(&document, DATE_META)
        .into_iter()
        .chain(
            document
                .select(&TIME)
                .filter_map(|el| el.value().attr("datetime").map(str::to_string)),
        )
        .find_map(|raw| parse_page_date(&raw))
        .map(|d| d.to_iso());

    let raw = RawExtraction {
        title,
        authors,
        date,
        text: densest_text(&document),
        sitename: host_of(url),
    };
    if !raw.has_content() {
        debug!(%url, "Readability found no content");
        return None;
    }
    Some(raw)
}

/// `"Headline | Site"` → `"Headline"`: keep the longest segment.
fn strip_site_suffix(title: &str) -> String {
    for sep in [" | ", " - ", " — ", " :: "] {
        if title.contains(sep) {
            if let Some(longest) = title.split(sep).max_by_key(|part| part.trim().len()) {
                return longest.trim().to_string();
            }
        }
    }
    title.to_string()
}

/// Names from byline markup, with "By" prefixes removed and multi-author
/// bylines split.
fn byline_authors(document: &Html) -> Option<Vec<String>> {
    let names: Vec<String> = document
        .select(&BYLINES)
        .filter_map(|el| element_text(&el))
        .flat_map(|line| {
            let line = BY_PREFIX.replace(&line, "").into_owned();
            AUTHOR_SPLIT
                .split(&line)
                .filter_map(clean_text)
                .collect::<Vec<_>>()
        })
        .filter(|name| name.len() <= MAX_AUTHOR_LEN)
        .unique()
        .collect();
    if names.is_empty() { None } else { Some(names) }
}

/// Body text of the container with the most paragraph text.
fn densest_text(document: &Html) -> Option<String> {
    let root = document.root_element();
    // Vec rather than a map keeps tie-breaking on document order.
    let mut scores = Vec::new();

    for p in document.select(&P) {
        if in_boilerplate(&p, &root) {
            continue;
        }
        let Some(text) = element_text(&p) else {
            continue;
        };
        if text.len() < MIN_SCORING_PARAGRAPH {
            continue;
        }
        if let Some(parent) = p.parent() {
            bump(&mut scores, parent.id(), text.len());
            if let Some(grandparent) = parent.parent() {
                bump(&mut scores, grandparent.id(), text.len() / 2);
            }
        }
    }

    // `max_by_key` keeps the last maximum; reversing makes the earliest win.
    let (best_id, best_score) = scores.into_iter().rev().max_by_key(|(_, score)| *score)?;
    let container = document.tree.get(best_id).and_then(ElementRef::wrap)?;
    debug!(score = best_score, tag = container.value().name(), "Selected densest container");

    let paragraphs: Vec<String> = container
        .select(&P)
        .filter(|p| !in_boilerplate(p, &container))
        .filter_map(|p| element_text(&p))
        .collect();
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

fn bump<K: PartialEq>(scores: &mut Vec<(K, usize)>, key: K, amount: usize) {
    match scores.iter_mut().find(|(k, _)| *k == key) {
        Some((_, score)) => *score += amount,
        None => scores.push((key, amount)),
    }
}
