//! Frame classification
//!
//! A [`Classifier`] maps one encoded frame to a textual verdict or a
//! failure. The relay treats it as a black box: [`ProcessClassifier`] runs
//! an external one-shot executable per frame, [`FixedClassifier`] returns
//! a canned outcome for tests and dry runs.
//!
//! Calls are independent and may run concurrently. No ordering or rate
//! limit is imposed between them.

pub mod config;
pub mod fixed;
pub mod process;

use std::fmt;
use std::future::Future;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

pub use config::{
    ClassifierConfig, CLASSIFIER_PATH_ENV, DEFAULT_CLASSIFIER_PATH, DEFAULT_MAX_OUTPUT,
    DEFAULT_TIMEOUT,
};
pub use fixed::FixedClassifier;
pub use process::ProcessClassifier;

/// Capability to classify one encoded frame
///
/// Implementations must resolve to an error rather than panic. The returned
/// future is driven on its own task, so it must be `Send`.
pub trait Classifier: Send + Sync + 'static {
    /// Classify an encoded frame
    fn classify(
        &self,
        frame: Arc<str>,
    ) -> impl Future<Output = Result<String, ClassifyError>> + Send;
}

impl<C: Classifier> Classifier for Arc<C> {
    fn classify(
        &self,
        frame: Arc<str>,
    ) -> impl Future<Output = Result<String, ClassifyError>> + Send {
        (**self).classify(frame)
    }
}

/// Reasons a classification attempt produced no verdict
#[derive(Debug)]
pub enum ClassifyError {
    /// The executable could not be started
    Spawn(std::io::Error),
    /// Reading the child's output or waiting on it failed
    Io(std::io::Error),
    /// The child exited unsuccessfully
    ExitStatus {
        status: ExitStatus,
        stderr: String,
    },
    /// The child did not finish in time and was killed
    Timeout(Duration),
    /// The child wrote more than the output bound
    OutputTooLarge { limit: usize },
    /// The child exited successfully without printing a verdict
    EmptyOutput,
    /// The output was not valid UTF-8
    InvalidOutput,
    /// Canned failure from a test classifier
    Rejected(String),
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::Spawn(e) => write!(f, "Failed to start classifier: {}", e),
            ClassifyError::Io(e) => write!(f, "Classifier I/O error: {}", e),
            ClassifyError::ExitStatus { status, stderr } if stderr.is_empty() => {
                write!(f, "Classifier exited with {}", status)
            }
            ClassifyError::ExitStatus { status, stderr } => {
                write!(f, "Classifier exited with {}: {}", status, stderr)
            }
            ClassifyError::Timeout(after) => {
                write!(f, "Classifier timed out after {}ms", after.as_millis())
            }
            ClassifyError::OutputTooLarge { limit } => {
                write!(f, "Classifier output exceeded {} bytes", limit)
            }
            ClassifyError::EmptyOutput => write!(f, "Classifier produced no output"),
            ClassifyError::InvalidOutput => write!(f, "Classifier output is not valid UTF-8"),
            ClassifyError::Rejected(reason) => write!(f, "Classification rejected: {}", reason),
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifyError::Spawn(e) | ClassifyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ClassifyError::Timeout(Duration::from_millis(1500)).to_string(),
            "Classifier timed out after 1500ms"
        );
        assert_eq!(
            ClassifyError::OutputTooLarge { limit: 1024 }.to_string(),
            "Classifier output exceeded 1024 bytes"
        );
        assert_eq!(
            ClassifyError::EmptyOutput.to_string(),
            "Classifier produced no output"
        );
    }

    #[tokio::test]
    async fn test_arc_classifier_delegates() {
        let classifier = Arc::new(FixedClassifier::verdict("glass"));
        let result = classifier.classify(Arc::from("AAAA")).await.unwrap();
        assert_eq!(result, "glass");
    }
}
