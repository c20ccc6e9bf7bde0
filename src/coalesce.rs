//! Extraction coalescing: primary first, fallback when needed, then back-fill.
//!
//! The [`Coalescer`] runs the precision-first adapter and only falls back to
//! the readability adapter when the primary result lacks a headline or a
//! body. A sufficient fallback result keeps its own title and text and
//! borrows `date`, `authors` and `sitename` from the primary where it has
//! none. When neither adapter is sufficient, the primary result wins as-is,
//! and a URL-only stub is the last resort.
//!
//! [`finalize`] turns the resulting [`ArticleDraft`] into the
//! [`ArticleRecord`] the sinks consume.

use crate::extractors::Extractor;
use crate::models::{ArticleDraft, ArticleRecord, Origin, RawExtraction, non_empty};
use tracing::{debug, info, instrument};

/// Runs the primary adapter and, when needed, the optional fallback.
#[derive(Debug, Clone)]
pub struct Coalescer<P, F> {
    primary: P,
    fallback: Option<F>,
}

impl<P: Extractor, F: Extractor> Coalescer<P, F> {
    /// `fallback` is `None` when the capability is compiled out or disabled.
    pub fn new(primary: P, fallback: Option<F>) -> Self {
        Self { primary, fallback }
    }

    /// Produce the best available draft for `url`.
    ///
    /// Never fails; the worst case is a stub carrying only the URL.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn coalesce(&self, url: &str) -> ArticleDraft {
        let primary = match self.primary.extract(url).await {
            Some(raw) if raw.is_sufficient() => {
                debug!(adapter = self.primary.name(), "Primary result is sufficient");
                return draft(url, raw, Origin::Primary);
            }
            other => other,
        };

        let secondary = match &self.fallback {
            Some(fallback) => {
                info!(adapter = fallback.name(), "Primary result insufficient; trying fallback");
                fallback.extract(url).await
            }
            None => {
                debug!("No fallback extractor available");
                None
            }
        };

        if let Some(mut base) = secondary.filter(RawExtraction::is_sufficient) {
            if let Some(primary) = &primary {
                let filled = backfill(&mut base, primary);
                if !filled.is_empty() {
                    debug!(fields = ?filled, "Back-filled fallback result from primary");
                }
            }
            return draft(url, base, Origin::Fallback);
        }

        match primary {
            Some(raw) => {
                info!("No sufficient result; keeping partial primary result");
                draft(url, raw, Origin::Primary)
            }
            None => {
                info!("No extractor produced anything; emitting stub");
                ArticleDraft::stub(url)
            }
        }
    }
}

fn draft(url: &str, fields: RawExtraction, origin: Origin) -> ArticleDraft {
    ArticleDraft {
        url: url.to_string(),
        fields,
        origin,
    }
}

/// Copy `date`, `authors` and `sitename` from `primary` into the gaps of
/// `base`. Returns the names of the fields that were filled.
fn backfill(base: &mut RawExtraction, primary: &RawExtraction) -> Vec<&'static str> {
    let mut filled = Vec::new();
    if !non_empty(&base.date) && non_empty(&primary.date) {
        base.date = primary.date.clone();
        filled.push("date");
    }
    if !base.has_authors() && primary.has_authors() {
        base.authors = primary.authors.clone();
        filled.push("authors");
    }
    if !non_empty(&base.sitename) && non_empty(&primary.sitename) {
        base.sitename = primary.sitename.clone();
        filled.push("sitename");
    }
    filled
}

/// Turn a draft into the record handed to the sinks.
///
/// `authors` becomes an empty list when no adapter found any.
pub fn finalize(draft: ArticleDraft) -> ArticleRecord {
    let ArticleDraft { url, fields, .. } = draft;
    ArticleRecord {
        url,
        title: fields.title,
        authors: fields.authors.unwrap_or_default(),
        date: fields.date,
        text: fields.text,
        sitename: fields.sitename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use std::cell::Cell;

    const URL: &str = "https://site.com/story";

    /// Extractor returning a canned result and counting its calls.
    #[derive(Default)]
    struct Canned {
        result: Option<RawExtraction>,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(result: Option<RawExtraction>) -> Self {
            Self {
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl Extractor for &Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn extract(&self, _url: &str) -> Option<RawExtraction> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn full() -> RawExtraction {
        RawExtraction {
            title: s("Headline"),
            authors: Some(vec!["Jane Doe".to_string()]),
            date: s("2024-01-01"),
            text: s("Body"),
            sitename: s("site.com"),
        }
    }

    #[tokio::test]
    async fn test_sufficient_primary_skips_fallback() {
        let primary = Canned::new(Some(full()));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("Other"),
            text: s("Other body"),
            ..Default::default()
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(fallback.calls.get(), 0);
        assert_eq!(primary.calls.get(), 1);
        assert_eq!(draft.origin, Origin::Primary);
        assert_eq!(draft.fields, full());
        assert_eq!(draft.url, URL);
    }

    #[tokio::test]
    async fn test_sufficient_primary_keeps_missing_date() {
        let primary = Canned::new(Some(RawExtraction {
            title: s("T"),
            text: s("Body"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("T"),
            text: s("Body"),
            date: s("2024-01-01"),
            authors: Some(vec!["Someone".to_string()]),
            ..Default::default()
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let record = finalize(coalescer.coalesce(URL).await);
        assert_eq!(fallback.calls.get(), 0);
        assert_eq!(record.title.as_deref(), Some("T"));
        assert_eq!(record.text.as_deref(), Some("Body"));
        assert_eq!(record.date, None);
        assert!(record.authors.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_lacks_text() {
        // Primary found metadata only; fallback recovers the article.
        let primary = Canned::new(Some(RawExtraction {
            title: s("T"),
            authors: Some(vec!["Jane Doe".to_string()]),
            date: s("2024-01-01"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("T2"),
            text: s("Body"),
            ..Default::default()
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let record = finalize(coalescer.coalesce(URL).await);
        assert_eq!(fallback.calls.get(), 1);
        assert_eq!(record.title.as_deref(), Some("T2"));
        assert_eq!(record.text.as_deref(), Some("Body"));
        assert_eq!(record.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(record.date.as_deref(), Some("2024-01-01"));
        assert_eq!(record.status(), RecordStatus::Successful);
    }

    #[tokio::test]
    async fn test_partial_primary_kept_when_fallback_empty() {
        let primary = Canned::new(Some(RawExtraction {
            date: s("2023-05-01"),
            sitename: s("site.com"),
            ..Default::default()
        }));
        let fallback = Canned::new(None);
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft.origin, Origin::Primary);
        let record = finalize(draft);
        assert_eq!(record.title, None);
        assert_eq!(record.text, None);
        assert!(record.authors.is_empty());
        assert_eq!(record.date.as_deref(), Some("2023-05-01"));
        assert_eq!(record.sitename.as_deref(), Some("site.com"));
        assert_eq!(record.status(), RecordStatus::Partial);
    }

    #[tokio::test]
    async fn test_stub_when_nothing_extracted() {
        let primary = Canned::new(None);
        let fallback = Canned::new(None);
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft, ArticleDraft::stub(URL));
        let record = finalize(draft);
        assert_eq!(record.url, URL);
        assert!(record.authors.is_empty());
        assert_eq!(record.status(), RecordStatus::Empty);
    }

    #[tokio::test]
    async fn test_backfill_does_not_override_fallback_values() {
        let primary = Canned::new(Some(RawExtraction {
            date: s("2020-01-01"),
            authors: Some(vec!["Primary Author".to_string()]),
            sitename: s("Primary Site"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("T"),
            text: s("Body"),
            date: s("2024-02-02T10:00:00Z"),
            authors: Some(vec![]),
            sitename: None,
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft.origin, Origin::Fallback);
        assert_eq!(draft.fields.date.as_deref(), Some("2024-02-02T10:00:00Z"));
        assert_eq!(draft.fields.authors, Some(vec!["Primary Author".to_string()]));
        assert_eq!(draft.fields.sitename.as_deref(), Some("Primary Site"));
    }

    #[tokio::test]
    async fn test_title_and_text_never_backfilled() {
        let primary = Canned::new(Some(RawExtraction {
            text: s("Primary body only"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("Fallback"),
            text: s("Fallback body"),
            ..Default::default()
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft.fields.title.as_deref(), Some("Fallback"));
        assert_eq!(draft.fields.text.as_deref(), Some("Fallback body"));
    }

    #[tokio::test]
    async fn test_complementary_partials_are_not_merged() {
        let primary = Canned::new(Some(RawExtraction {
            text: s("Only text"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(RawExtraction {
            title: s("Only title"),
            ..Default::default()
        }));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft.origin, Origin::Primary);
        assert_eq!(draft.fields.title, None);
        assert_eq!(draft.fields.text.as_deref(), Some("Only text"));
    }

    #[tokio::test]
    async fn test_missing_fallback_capability() {
        let primary = Canned::new(Some(RawExtraction {
            title: s("Only title"),
            ..Default::default()
        }));
        let coalescer: Coalescer<&Canned, &Canned> = Coalescer::new(&primary, None);

        let draft = coalescer.coalesce(URL).await;
        assert_eq!(draft.origin, Origin::Primary);
        assert_eq!(draft.fields.title.as_deref(), Some("Only title"));
    }

    #[tokio::test]
    async fn test_coalesce_is_idempotent() {
        let primary = Canned::new(Some(RawExtraction {
            date: s("2024-01-01"),
            ..Default::default()
        }));
        let fallback = Canned::new(Some(full()));
        let coalescer = Coalescer::new(&primary, Some(&fallback));

        let first = finalize(coalescer.coalesce(URL).await);
        let second = finalize(coalescer.coalesce(URL).await);
        assert_eq!(first, second);
        assert_eq!(fallback.calls.get(), 2);
    }
}
