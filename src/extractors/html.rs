//! Shared parsed-document helpers for the extractor adapters.
//!
//! JSON-LD collection, meta-tag lookup, whitespace cleanup, byline
//! collapsing and date normalization. Nothing in here fetches; it all works
//! on an already parsed [`Html`] document.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

static JSONLD: Lazy<Selector> = Lazy::new(|| sel(r#"script[type="application/ld+json"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| sel("title"));

/// Elements whose text is never article body.
pub const BOILERPLATE: &[&str] = &[
    "aside", "figure", "figcaption", "nav", "footer", "header", "form", "script", "style",
    "noscript", "button",
];

/// JSON-LD `@type`s treated as an article.
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "BlogPosting",
    "WebPage",
];

pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Collapse whitespace runs and trim; blank becomes `None`.
pub fn clean_text(s: &str) -> Option<String> {
    let cleaned = s.split_whitespace().join(" ");
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Cleaned text content of an element.
pub fn element_text(el: &ElementRef<'_>) -> Option<String> {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Whether an element sits inside navigation, captions or other chrome.
///
/// Only ancestors below `within` are inspected, so a page-wide wrapper such
/// as an ASP.NET `<form>` does not disqualify the whole body.
pub fn in_boilerplate(el: &ElementRef<'_>, within: &ElementRef<'_>) -> bool {
    el.ancestors()
        .take_while(|n| n.id() != within.id())
        .filter_map(|n| n.value().as_element())
        .any(|e| BOILERPLATE.contains(&e.name()))
}

/// Text of the first element matching `selector`.
pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|el| element_text(&el))
}

/// `content` of the first `<meta>` whose `property` or `name` equals one of `keys`.
///
/// Keys are tried in order, so earlier keys take precedence.
pub fn meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let css = format!(r#"meta[property="{key}"], meta[name="{key}"], meta[itemprop="{key}"]"#);
        let selector = Selector::parse(&css).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .find_map(clean_text)
    })
}

/// Document `<title>`, cleaned.
pub fn document_title(document: &Html) -> Option<String> {
    first_text(document, &TITLE)
}

/// All JSON-LD objects in the page, with top-level arrays and `@graph` flattened.
///
/// Malformed blocks are skipped.
pub fn jsonld_objects(document: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    for script in document.select(&JSONLD) {
        let raw = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            flatten_jsonld(value, &mut out);
        }
    }
    out
}

fn flatten_jsonld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_jsonld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_jsonld(graph, out);
            }
            if map.contains_key("@type") {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn has_article_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// The most article-like JSON-LD object: a news/article type with a headline
/// beats one without, and any article type beats a bare `WebPage`.
pub fn article_jsonld(objects: &[Value]) -> Option<&Value> {
    objects
        .iter()
        .filter(|v| has_article_type(v))
        .max_by_key(|v| {
            let is_webpage = v.get("@type").and_then(Value::as_str) == Some("WebPage");
            let has_headline = v.get("headline").is_some();
            (has_headline as u8) * 2 + (!is_webpage as u8)
        })
}

/// String value of a JSON-LD field, cleaned.
pub fn jsonld_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).and_then(clean_text)
}

/// `publisher.name` from a JSON-LD object.
pub fn jsonld_publisher(value: &Value) -> Option<String> {
    let publisher = value.get("publisher")?;
    match publisher {
        Value::Object(_) => jsonld_str(publisher, "name"),
        Value::String(s) => clean_text(s),
        Value::Array(items) => items.iter().find_map(|p| jsonld_str(p, "name")),
        _ => None,
    }
}

/// Author names from a JSON-LD `author` value.
///
/// Accepts a bare string, an object with `name`, or an array of either; a
/// scalar becomes a one-element list. Duplicates are dropped, order kept.
pub fn jsonld_authors(value: &Value) -> Vec<String> {
    let mut authors = Vec::new();
    collect_authors(value, &mut authors);
    authors.into_iter().unique().collect()
}

fn collect_authors(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(clean_text(s)),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name") {
                collect_authors(name, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_authors(item, out);
            }
        }
        _ => {}
    }
}

/// A single scalar byline as a one-element list.
pub fn scalar_author(s: &str) -> Option<Vec<String>> {
    clean_text(s).map(|a| vec![a])
}

/// A date as found on the page, classified by how much we know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDate {
    /// Carried a UTC offset; converted to UTC.
    Aware(DateTime<Utc>),
    /// Date and time, no offset.
    Naive(String),
    /// Calendar date only.
    Day(NaiveDate),
}

/// Parse a page date string. Unparseable strings yield `None`.
pub fn parse_page_date(raw: &str) -> Option<PageDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(PageDate::Aware(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(PageDate::Aware(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(PageDate::Aware(dt.with_timezone(&Utc)));
    }
    if NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").is_ok()
    {
        return Some(PageDate::Naive(raw.to_string()));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(PageDate::Day(d));
    }
    None
}

impl PageDate {
    /// Full ISO-8601: UTC with `Z` when aware, otherwise as found.
    #[cfg(any(feature = "fallback", test))]
    pub fn to_iso(&self) -> String {
        match self {
            PageDate::Aware(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            PageDate::Naive(s) => s.clone(),
            PageDate::Day(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Calendar date `YYYY-MM-DD`, taken in UTC when the offset is known.
    pub fn to_day(&self) -> String {
        match self {
            PageDate::Aware(dt) => dt.format("%Y-%m-%d").to_string(),
            PageDate::Naive(s) => s.chars().take(10).collect(),
            PageDate::Day(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}
