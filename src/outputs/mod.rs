//! Persistence of finalized article records.
//!
//! Every record ends up in up to three places:
//!
//! # Submodules
//!
//! - [`markdown`]: One Markdown document per article, with YAML front matter
//! - [`jsonl`]: Append-only JSON Lines catalog
//! - [`tabular`]: Append-only CSV catalog
//!
//! # Output Structure
//!
//! ```text
//! articles/
//! ├── 2024-03-11_council-approves-budget.md
//! ├── storm-closes-schools.md
//! └── 3f2a9c01be.md          # title slugged to nothing; URL hash
//!
//! catalog.jsonl              # one JSON object per line
//! catalog.csv                # url,title,date,authors,sitename,text
//! ```
//!
//! Catalogs are opened in append mode and flushed per record, so a run that
//! stops midway leaves every file valid.

use crate::models::ArticleRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

pub mod jsonl;
pub mod markdown;
pub mod tabular;

/// Errors from writing a record to disk.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML front matter encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Trait for anything that can store a finalized record.
pub trait RecordSink {
    /// Persist `record`, returning the path of the primary artifact.
    async fn persist(&self, record: &ArticleRecord) -> Result<PathBuf, PersistError>;
}

/// Markdown documents plus optional JSONL and CSV catalogs.
#[derive(Debug, Clone)]
pub struct ArchiveSink {
    output_dir: PathBuf,
    jsonl: Option<PathBuf>,
    csv: Option<PathBuf>,
}

impl ArchiveSink {
    /// An empty catalog path disables that catalog.
    pub fn new(output_dir: PathBuf, jsonl: PathBuf, csv: PathBuf) -> Self {
        let enabled = |p: PathBuf| (!p.as_os_str().is_empty()).then_some(p);
        Self {
            output_dir,
            jsonl: enabled(jsonl),
            csv: enabled(csv),
        }
    }
}

impl RecordSink for ArchiveSink {
    #[instrument(level = "info", skip_all, fields(url = %record.url))]
    async fn persist(&self, record: &ArticleRecord) -> Result<PathBuf, PersistError> {
        let path = markdown::write_document(record, &self.output_dir).await?;
        if let Some(jsonl_path) = &self.jsonl {
            jsonl::append_record(jsonl_path, record).await?;
        }
        if let Some(csv_path) = &self.csv {
            tabular::append_record(csv_path, record).await?;
        }
        info!(path = %path.display(), "Persisted record");
        Ok(path)
    }
}

/// Create the parent directory of `path` if it has one.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord {
            url: "https://site.com/story".to_string(),
            title: Some("T2".to_string()),
            authors: vec!["Jane Doe".to_string()],
            date: Some("2024-01-01".to_string()),
            text: Some("Body".to_string()),
            sitename: Some("site.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_persist_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArchiveSink::new(
            dir.path().join("articles"),
            dir.path().join("out/catalog.jsonl"),
            dir.path().join("out/catalog.csv"),
        );

        let path = sink.persist(&record()).await.unwrap();
        assert_eq!(path, dir.path().join("articles/2024-01-01_t2.md"));
        assert!(path.is_file());

        let jsonl = std::fs::read_to_string(dir.path().join("out/catalog.jsonl")).unwrap();
        assert_eq!(jsonl.lines().count(), 1);
        let csv = std::fs::read_to_string(dir.path().join("out/catalog.csv")).unwrap();
        assert!(csv.starts_with("url,title,date,authors,sitename,text"));
    }

    #[tokio::test]
    async fn test_empty_catalog_paths_disable_catalogs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArchiveSink::new(dir.path().to_path_buf(), PathBuf::new(), PathBuf::new());
        assert!(sink.jsonl.is_none());
        assert!(sink.csv.is_none());

        sink.persist(&record()).await.unwrap();
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let sink = ArchiveSink::new(blocker.join("articles"), PathBuf::new(), PathBuf::new());

        let err = sink.persist(&record()).await.unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
