//! Detection log file
//!
//! The log is a single JSON array rewritten in full on every append. There
//! is no index, so each append costs O(n) in the log size. A missing or
//! unparseable file reads as an empty log; corruption is dropped on the
//! next write rather than reported.
//!
//! `DetectionLog::append` is a read-modify-write and must not run
//! concurrently with itself. Route appends through
//! [`DetectionLogWriter`](super::DetectionLogWriter).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::record::DetectionRecord;

/// Default log location, under the statically served directory
pub const DEFAULT_DETECTION_LOG_PATH: &str = "static/detection.json";

/// Append-only detection log backed by a JSON file
#[derive(Debug, Clone)]
pub struct DetectionLog {
    path: PathBuf,
}

impl DetectionLog {
    /// Create a log at `path`; nothing is touched until the first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records
    ///
    /// A missing or corrupt file yields an empty sequence. Other read
    /// failures are returned so an unreadable log is never overwritten.
    pub async fn load(&self) -> Result<Vec<DetectionRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Detection log unparseable, starting from empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Append one record and rewrite the file
    ///
    /// Creates the parent directory if needed. Returns the new record count.
    pub async fn append(&self, record: DetectionRecord) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut records = self.load().await?;
        records.push(record);

        let json = serde_json::to_vec_pretty(&records)?;
        let tmp = self.temp_path()?;

        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(records.len())
    }

    /// Sibling file the new contents are staged in before the rename
    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            Error::Config(format!(
                "detection log path '{}' has no file name",
                self.path.display()
            ))
        })?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}

impl Default for DetectionLog {
    fn default() -> Self {
        Self::new(DEFAULT_DETECTION_LOG_PATH)
    }
}
