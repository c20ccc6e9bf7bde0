//! Append-only CSV catalog.
//!
//! Columns are fixed: `url,title,date,authors,sitename,text`. The header row
//! is written only when the file does not exist yet, so repeated runs keep
//! appending to the same table. Authors are joined with `", "`; missing
//! fields are empty cells.

use super::PersistError;
use crate::models::ArticleRecord;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Header row of the catalog.
pub const CSV_HEADER: [&str; 6] = ["url", "title", "date", "authors", "sitename", "text"];

/// Encode rows with RFC 4180 quoting.
fn encode_rows<'a>(rows: impl IntoIterator<Item = [&'a str; 6]>) -> Result<Vec<u8>, PersistError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| PersistError::Io(e.into_error()))
}

/// Append `record` as one row to the catalog at `path`.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), url = %record.url))]
pub async fn append_record(path: &Path, record: &ArticleRecord) -> Result<(), PersistError> {
    let authors = record.authors.join(", ");
    let row = [
        record.url.as_str(),
        record.title.as_deref().unwrap_or(""),
        record.date.as_deref().unwrap_or(""),
        authors.as_str(),
        record.sitename.as_deref().unwrap_or(""),
        record.text.as_deref().unwrap_or(""),
    ];

    super::ensure_parent(path).await?;
    let new_file = !fs::try_exists(path).await?;
    let bytes = if new_file {
        encode_rows([CSV_HEADER, row])?
    } else {
        encode_rows([row])?
    };

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    debug!(new_file, bytes = bytes.len(), "Appended CSV row");
    Ok(())
}
