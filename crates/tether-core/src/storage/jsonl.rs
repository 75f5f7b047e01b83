//! File helpers shared by the stores: JSON documents and JSONL logs

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use std::io::SeekFrom;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::{TetherError, TetherResult};

/// Read every parseable record of a JSONL file.
///
/// A missing file is an empty log. Lines that fail to parse are skipped.
pub(crate) async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> TetherResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to open log: {}", e), path))?;

    let mut lines = BufReader::new(file).lines();
    let mut records = Vec::new();
    let mut skipped = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to read line: {}", e), path))?
    {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(
                    "Skipping unreadable line in {:?}: {} - line: {}",
                    path,
                    e,
                    line.chars().take(50).collect::<String>()
                );
            }
        }
    }

    debug!(
        "Read {} records from {:?} ({} skipped)",
        records.len(),
        path,
        skipped
    );
    Ok(records)
}

/// Append records to a JSONL file with a single write.
///
/// A torn last line (no trailing newline) is terminated first so the new
/// records start on a line of their own.
pub(crate) async fn append_jsonl<T: Serialize>(path: &Path, records: &[T]) -> TetherResult<()> {
    if records.is_empty() {
        return Ok(());
    }

    ensure_parent(path).await?;
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to open log for append: {}", e), path))?;

    let mut buf = String::new();
    if ends_with_partial_line(&mut file).await? {
        warn!("Terminating partial last line in {:?}", path);
        buf.push('\n');
    }
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }

    file.write_all(buf.as_bytes())
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to append to log: {}", e), path))?;
    file.flush().await?;
    Ok(())
}

async fn ends_with_partial_line(file: &mut File) -> TetherResult<bool> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Read a JSON document; missing or corrupt documents are `None`
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("No document at {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_str::<T>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse {:?}: {}", path, e);
            None
        }
    }
}

/// Replace a whole file through a temp file and a rename
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> TetherResult<()> {
    ensure_parent(path).await?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to write temp file: {}", e), &tmp))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| TetherError::io_at(format!("Failed to replace file: {}", e), path))?;
    Ok(())
}

/// Serialize and atomically write a JSON document
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> TetherResult<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content).await
}

async fn ensure_parent(path: &Path) -> TetherResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await.map_err(|e| {
                TetherError::io_at(format!("Failed to create directory: {}", e), parent)
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Line {
        id: String,
    }

    fn line(id: &str) -> Line {
        Line { id: id.to_string() }
    }

    #[tokio::test]
    async fn test_append_after_torn_line_starts_fresh_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.jsonl");

        append_jsonl(&path, &[line("a")]).await.unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(br#"{"id":"torn","createT"#).await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        append_jsonl(&path, &[line("b")]).await.unwrap();

        let records: Vec<Line> = read_jsonl(&path).await.unwrap();
        assert_eq!(records, vec![line("a"), line("b")]);
    }

    #[tokio::test]
    async fn test_append_to_clean_log_adds_no_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("log.jsonl");

        append_jsonl(&path, &[line("a"), line("b")]).await.unwrap();
        append_jsonl(&path, &[line("c")]).await.unwrap();

        let raw = fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(!raw.contains("\n\n"));
    }
}
