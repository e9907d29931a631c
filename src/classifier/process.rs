//! Subprocess classifier
//!
//! Runs the configured executable once per frame:
//!
//! ```text
//! <program> [leading_args...] <encoded frame>
//! ```
//!
//! The trimmed stdout is the verdict. Non-zero exit, timeout, empty or
//! oversized output are failures. The child is killed if the call is
//! abandoned (timeout or drop).

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::config::ClassifierConfig;
use super::{Classifier, ClassifyError};

/// Bytes of stderr kept for diagnostics
const STDERR_EXCERPT: usize = 4096;

/// Classifier backed by an external one-shot process
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    config: ClassifierConfig,
}

impl ProcessClassifier {
    /// Create a classifier with the given invocation config
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Get the invocation config
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    async fn run(&self, frame: &str) -> Result<String, ClassifyError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.leading_args)
            .arg(frame)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ClassifyError::Spawn)?;

        // Drain stderr on its own task so a chatty child cannot block on a full pipe.
        // A grandchild may hold the pipe open after the child is killed, so the
        // drain is aborted whenever this call returns.
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| AbortOnDrop(tokio::spawn(read_excerpt(stderr))));

        let stdout = child.stdout.take().ok_or_else(|| {
            ClassifyError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "classifier stdout not captured",
            ))
        })?;

        let limit = self.config.max_output;
        let mut output = Vec::new();
        stdout
            .take(limit as u64 + 1)
            .read_to_end(&mut output)
            .await
            .map_err(ClassifyError::Io)?;

        if output.len() > limit {
            // Dropping the child kills it
            return Err(ClassifyError::OutputTooLarge { limit });
        }

        let status = child.wait().await.map_err(ClassifyError::Io)?;
        if !status.success() {
            let stderr = match stderr_task {
                Some(mut task) => (&mut task.0).await.unwrap_or_default(),
                None => String::new(),
            };
            return Err(ClassifyError::ExitStatus { status, stderr });
        }

        let text = String::from_utf8(output).map_err(|_| ClassifyError::InvalidOutput)?;
        let verdict = text.trim();
        if verdict.is_empty() {
            return Err(ClassifyError::EmptyOutput);
        }

        Ok(verdict.to_string())
    }
}

impl Classifier for ProcessClassifier {
    async fn classify(&self, frame: Arc<str>) -> Result<String, ClassifyError> {
        match tokio::time::timeout(self.config.timeout, self.run(&frame)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout(self.config.timeout)),
        }
    }
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Read a stream to EOF, keeping only its first `STDERR_EXCERPT` bytes
async fn read_excerpt<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = STDERR_EXCERPT.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }

    String::from_utf8_lossy(&kept).trim().to_string()
}
