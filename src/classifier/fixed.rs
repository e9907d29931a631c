//! Deterministic classifier for tests and dry runs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Classifier, ClassifyError};

/// Classifier that returns the same outcome for every frame
///
/// An optional delay simulates a slow model so tests can observe that the
/// raw relay does not wait for classification.
#[derive(Debug)]
pub struct FixedClassifier {
    verdict: Option<String>,
    delay: Duration,
    calls: AtomicU64,
}

impl FixedClassifier {
    /// Always succeed with `verdict`
    pub fn verdict(verdict: impl Into<String>) -> Self {
        Self {
            verdict: Some(verdict.into()),
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Always fail
    pub fn failing() -> Self {
        Self {
            verdict: None,
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Wait this long before resolving
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of frames classified so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Classifier for FixedClassifier {
    async fn classify(&self, _frame: Arc<str>) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.verdict {
            Some(verdict) => Ok(verdict.clone()),
            None => Err(ClassifyError::Rejected("fixed failure".into())),
        }
    }
}
