//! Append-only JSON Lines catalog.
//!
//! One JSON object per line, one line per record. Fields that are `None`
//! are omitted; `authors` is always present.

use super::PersistError;
use crate::models::ArticleRecord;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Append `record` as a single line to the catalog at `path`.
///
/// The file and its parent directories are created on first use. The line
/// is written and flushed before returning.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), url = %record.url))]
pub async fn append_record(path: &Path, record: &ArticleRecord) -> Result<(), PersistError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    super::ensure_parent(path).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    debug!(bytes = line.len(), "Appended JSONL record");
    Ok(())
}
