//! Per-article Markdown documents with YAML front matter.
//!
//! # Format
//!
//! ```text
//! ---
//! title: Council Approves Budget
//! url: https://news.example.com/2024/03/10/story
//! site: Example News
//! date: 2024-03-11
//! authors:
//! - Jane Doe
//! ---
//! The city council approved the budget on Sunday.
//! ```
//!
//! # Filenames
//!
//! `<YYYY-MM-DD_>?<slug>.md`. The date prefix is present only when the
//! record's date parses; the slug comes from the front-matter title and
//! falls back to a short URL hash when the title slugs to nothing.

use super::PersistError;
use crate::models::{ArticleRecord, non_empty};
use crate::utils::{date_prefix, slugify_title, url_hash};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    url: &'a str,
    site: &'a str,
    date: &'a str,
    authors: &'a [String],
}

/// Title shown in the document: the headline, else the site name, else the host.
pub fn display_title(record: &ArticleRecord) -> String {
    [&record.title, &record.sitename]
        .into_iter()
        .find(|field| non_empty(field))
        .and_then(|field| field.clone())
        .or_else(|| record.host())
        .unwrap_or_default()
}

/// Render the full Markdown document for a record.
pub fn render_markdown(record: &ArticleRecord) -> Result<String, PersistError> {
    let title = display_title(record);
    let front = FrontMatter {
        title: &title,
        url: &record.url,
        site: record.sitename.as_deref().unwrap_or(""),
        date: record.date.as_deref().unwrap_or(""),
        authors: &record.authors,
    };
    let yaml = serde_yaml::to_string(&front)?;
    let body = record.text.as_deref().unwrap_or("").trim();
    Ok(format!("---\n{}---\n{}\n", yaml, body))
}

/// Filename for a record's document.
pub fn document_filename(record: &ArticleRecord) -> String {
    let mut slug = slugify_title(&display_title(record));
    if slug.is_empty() {
        slug = url_hash(&record.url);
    }
    match record.date.as_deref().and_then(date_prefix) {
        Some(day) => format!("{}_{}.md", day, slug),
        None => format!("{}.md", slug),
    }
}

/// Write the record's document into `output_dir` and return its path.
///
/// An existing file with the same name is overwritten.
#[instrument(level = "info", skip_all, fields(url = %record.url))]
pub async fn write_document(
    record: &ArticleRecord,
    output_dir: &Path,
) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(document_filename(record));
    let markdown = render_markdown(record)?;
    fs::write(&path, markdown).await?;
    info!(path = %path.display(), "Wrote Markdown document");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord {
            url: "https://news.example.com/story".to_string(),
            title: Some("Council Approves Budget".to_string()),
            authors: vec!["Jane Doe".to_string(), "Sam Lee".to_string()],
            date: Some("2024-03-11".to_string()),
            text: Some("\n  The council voted.\n\nSpending rises.  \n".to_string()),
            sitename: Some("Example News".to_string()),
        }
    }

    fn stub() -> ArticleRecord {
        ArticleRecord {
            url: "https://stub.example.org/p?id=7".to_string(),
            title: None,
            authors: vec![],
            date: None,
            text: None,
            sitename: None,
        }
    }

    fn front_matter(doc: &str) -> serde_yaml::Value {
        let inner = doc
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("---\n"))
            .map(|(yaml, _)| yaml)
            .unwrap();
        serde_yaml::from_str(inner).unwrap()
    }

    #[test]
    fn test_render_front_matter_and_body() {
        let doc = render_markdown(&record()).unwrap();
        let fm = front_matter(&doc);
        assert_eq!(fm["title"].as_str(), Some("Council Approves Budget"));
        assert_eq!(fm["url"].as_str(), Some("https://news.example.com/story"));
        assert_eq!(fm["site"].as_str(), Some("Example News"));
        assert_eq!(fm["date"].as_str(), Some("2024-03-11"));
        assert_eq!(fm["authors"][1].as_str(), Some("Sam Lee"));
        assert!(doc.ends_with("---\nThe council voted.\n\nSpending rises.\n"));
    }

    #[test]
    fn test_render_stub_uses_host_and_empty_fields() {
        let doc = render_markdown(&stub()).unwrap();
        let fm = front_matter(&doc);
        assert_eq!(fm["title"].as_str(), Some("stub.example.org"));
        assert_eq!(fm["site"].as_str(), Some(""));
        assert_eq!(fm["date"].as_str(), Some(""));
        assert_eq!(fm["authors"].as_sequence().map(Vec::len), Some(0));
        assert!(doc.ends_with("---\n\n"));
    }

    #[test]
    fn test_title_needing_quotes_survives_yaml() {
        let rec = ArticleRecord {
            title: Some("Breaking: \"quoted\" #1 - yes".to_string()),
            ..record()
        };
        let fm = front_matter(&render_markdown(&rec).unwrap());
        assert_eq!(fm["title"].as_str(), Some("Breaking: \"quoted\" #1 - yes"));
    }

    #[test]
    fn test_display_title_precedence() {
        assert_eq!(display_title(&record()), "Council Approves Budget");
        let no_title = ArticleRecord {
            title: Some(String::new()),
            ..record()
        };
        assert_eq!(display_title(&no_title), "Example News");
        assert_eq!(display_title(&stub()), "stub.example.org");
    }

    #[test]
    fn test_document_filename() {
        assert_eq!(
            document_filename(&record()),
            "2024-03-11_council-approves-budget.md"
        );

        let undated = ArticleRecord {
            date: Some("sometime last week".to_string()),
            ..record()
        };
        assert_eq!(document_filename(&undated), "council-approves-budget.md");

        assert_eq!(document_filename(&stub()), "stub.example.org.md");
    }

    #[test]
    fn test_document_filename_falls_back_to_hash() {
        let rec = ArticleRecord {
            title: Some("日本語のタイトル".to_string()),
            date: Some("2024-01-02T03:04:05Z".to_string()),
            ..record()
        };
        let expected = format!("2024-01-02_{}.md", url_hash(&rec.url));
        assert_eq!(document_filename(&rec), expected);
        assert_eq!(document_filename(&rec), document_filename(&rec.clone()));
    }

    #[tokio::test]
    async fn test_write_document() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("articles");
        let path = write_document(&record(), &out).await.unwrap();
        assert_eq!(path, out.join("2024-03-11_council-approves-budget.md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("---\ntitle: Council Approves Budget\n"));
    }
}
