//! Primary, precision-first metadata extractor.
//!
//! Prefers what the publisher declares about the page: JSON-LD `Article`
//! objects first, then OpenGraph and `<meta>` tags, then visible markup. The
//! body comes from the paragraphs of the first `articleBody`, `<article>` or
//! `<main>` container, leaving figures, asides and navigation out.
//!
//! Dates are reported as a calendar day (`YYYY-MM-DD`), converted to UTC
//! first when the page gives an offset.

use super::html::{
    article_jsonld, document_title, element_text, first_text, in_boilerplate,
    jsonld_authors, jsonld_objects, jsonld_publisher, jsonld_str, meta_content, parse_page_date,
    scalar_author, sel,
};
use super::{Extractor, fetch_html};
use crate::fetch::FetchPage;
use crate::models::RawExtraction;
use crate::utils::host_of;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

static H1: Lazy<Selector> = Lazy::new(|| sel("h1"));
static P: Lazy<Selector> = Lazy::new(|| sel("p"));
static TIME: Lazy<Selector> = Lazy::new(|| sel("time[datetime]"));
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"[itemprop="articleBody"]"#, "article", "main", r#"[role="main"]"#]
        .into_iter()
        .map(sel)
        .collect()
});

const TITLE_META: &[&str] = &["og:title", "twitter:title"];
const DATE_META: &[&str] = &[
    "article:published_time",
    "datePublished",
    "date",
    "pubdate",
    "dc.date",
];
const SITE_META: &[&str] = &["og:site_name", "application-name"];

/// Precision-first adapter reading declared page metadata.
#[derive(Debug, Clone)]
pub struct MetadataExtractor<F> {
    fetcher: F,
}

impl<F: FetchPage> MetadataExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: FetchPage> Extractor for MetadataExtractor<F> {
    fn name(&self) -> &'static str {
        "metadata"
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
                "Metadata extraction finished"
            ),
            None => info!("Metadata extraction found nothing"),
        }
        extraction
    }
}

/// Extract from an already fetched page.
///
/// Returns `None` when no title, body, date or byline was found.
pub fn parse_page(url: &str, html: &str) -> Option<RawExtraction> {
    let document = Html::parse_document(html);
    let objects = jsonld_objects(&document);
    let article = article_jsonld(&objects);

    let title = article
        .and_then(|a| jsonld_str(a, "headline").or_else(|| jsonld_str(a, "name")))
        .or_else(|| meta_content(&document, TITLE_META))
        .or_else(|| first_text(&document, &H1))
        .or_else(|| document_title(&document));

    let authors = article
        .and_then(|a| a.get("author"))
        .map(jsonld_authors)
        .filter(|a| !a.is_empty())
        .or_else(|| meta_content(&document, &["author"]).and_then(|a| scalar_author(&a)))
        .or_else(|| {
            meta_content(&document, &["article:author"])
                .filter(|a| !a.starts_with("http"))
                .and_then(|a| scalar_author(&a))
        });

    let date = article
        .and_then(|a| jsonld_str(a, "datePublished").or_else(|| jsonld_str(a, "dateCreated")))
        .into_iter()
        .chain(meta_content(&document, DATE_META))
        .chain(
            document
                .select(&TIME)
                .filter_map(|el| el.value().attr("datetime").map(str::to_string)),
        )
        .find_map(|raw| parse_page_date(&raw))
        .map(|d| d.to_day());

    let text = body_text(&document).or_else(|| article.and_then(|a| jsonld_str(a, "articleBody")));

    let sitename = meta_content(&document, SITE_META)
        .or_else(|| article.and_then(jsonld_publisher))
        .or_else(|| host_of(url));

    let raw = RawExtraction {
        title,
        authors,
        date,
        text,
        sitename,
    };
    if !raw.has_content() {
        debug!(%url, "No article content or metadata on page");
        return None;
    }
    Some(raw)
}

/// Paragraphs of the first recognised content container, one per line.
fn body_text(document: &Html) -> Option<String> {
    CONTAINERS.iter().find_map(|container_sel| {
        document.select(container_sel).find_map(|container| {
            let paragraphs: Vec<String> = container
                .select(&P)
                .filter(|p| !in_boilerplate(p, &container))
                .filter_map(|p| element_text(&p))
                .collect();
            if paragraphs.is_empty() {
                None
            } else {
                Some(paragraphs.join("\n"))
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::PageMap;

    const URL: &str = "https://news.example.com/2024/03/10/story";

    const FULL_PAGE: &str = r#"
        <html><head>
          <title>Fallback Title - News</title>
          <meta property="og:site_name" content="Example News">
          <script type="application/ld+json">
          {"@context":"https://schema.org","@type":"NewsArticle",
           "headline":"Council Approves Budget",
           "author":{"@type":"Person","name":"Jane Doe"},
           "datePublished":"2024-03-10T23:30:00-05:00"}
          </script>
        </head><body>
          <nav><p>Home | World | Sports</p></nav>
          <article>
            <h1>Council Approves Budget</h1>
            <figure><p>Photo: city hall</p></figure>
            <p>The city council approved the budget on Sunday.</p>
            <p>  Spending rises   by 4 percent. </p>
            <aside><p>Related: last year's budget</p></aside>
          </article>
        </body></html>"#;

    #[test]
    fn test_parse_full_page() {
        let raw = parse_page(URL, FULL_PAGE).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Council Approves Budget"));
        assert_eq!(raw.authors, Some(vec!["Jane Doe".to_string()]));
        assert_eq!(raw.date.as_deref(), Some("2024-03-11"));
        assert_eq!(
            raw.text.as_deref(),
            Some("The city council approved the budget on Sunday.\nSpending rises by 4 percent.")
        );
        assert_eq!(raw.sitename.as_deref(), Some("Example News"));
        assert!(raw.is_sufficient());
    }

    #[test]
    fn test_meta_fallbacks_and_host_sitename() {
        let page = r#"
            <html><head>
              <meta property="og:title" content="OG Title">
              <meta name="author" content="Sam Reporter">
              <meta property="article:published_time" content="2023-05-01">
            </head><body><main><p>Body text here.</p></main></body></html>"#;
        let raw = parse_page(URL, page).unwrap();
        assert_eq!(raw.title.as_deref(), Some("OG Title"));
        assert_eq!(raw.authors, Some(vec!["Sam Reporter".to_string()]));
        assert_eq!(raw.date.as_deref(), Some("2023-05-01"));
        assert_eq!(raw.text.as_deref(), Some("Body text here."));
        assert_eq!(raw.sitename.as_deref(), Some("news.example.com"));
    }

    #[test]
    fn test_metadata_only_page_is_partial() {
        let page = r#"
            <html><head>
              <meta property="og:site_name" content="site.com">
              <meta property="article:published_time" content="2023-05-01T08:00:00Z">
            </head><body><div>No paragraphs in a container.</div></body></html>"#;
        let raw = parse_page(URL, page).unwrap();
        assert!(raw.title.is_none());
        assert!(raw.text.is_none());
        assert_eq!(raw.date.as_deref(), Some("2023-05-01"));
        assert_eq!(raw.sitename.as_deref(), Some("site.com"));
        assert!(!raw.is_sufficient());
    }

    #[test]
    fn test_empty_page_is_none() {
        assert!(parse_page(URL, "<html><body><div></div></body></html>").is_none());
    }

    #[test]
    fn test_article_body_from_jsonld_when_no_container() {
        let page = r#"
            <html><head>
            <script type="application/ld+json">
              {"@type":"Article","headline":"H","articleBody":"Declared body."}
            </script></head><body></body></html>"#;
        let raw = parse_page(URL, page).unwrap();
        assert_eq!(raw.text.as_deref(), Some("Declared body."));
    }

    #[test]
    fn test_author_url_meta_is_ignored() {
        let page = r#"
            <html><head>
              <meta property="article:author" content="https://facebook.com/someone">
            </head><body><article><h1>T</h1><p>B</p></article></body></html>"#;
        let raw = parse_page(URL, page).unwrap();
        assert!(raw.authors.is_none());
    }

    #[tokio::test]
    async fn test_extract_through_fetcher() {
        let pages = PageMap::default().with(URL, FULL_PAGE);
        let extractor = MetadataExtractor::new(pages);
        let raw = extractor.extract(URL).await.unwrap();
        assert_eq!(raw.title.as_deref(), Some("Council Approves Budget"));
    }

    #[tokio::test]
    async fn test_extract_fetch_failure_is_none() {
        let extractor = MetadataExtractor::new(PageMap::default());
        assert!(extractor.extract(URL).await.is_none());
    }
}
