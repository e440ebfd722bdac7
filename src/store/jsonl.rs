//! Append-only JSON Lines log files under a data directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;

/// Writes one JSON document per line to files in `dir`.
#[derive(Debug, Clone)]
pub struct JsonlLog {
    dir: PathBuf,
}

impl JsonlLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append `record` as a single line to `dir/filename`, creating both if needed.
    pub async fn append<T: Serialize>(&self, filename: &str, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), "Appended JSONL record");
        Ok(())
    }
}
