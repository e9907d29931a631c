//! Detection record type

use serde::{Deserialize, Serialize};

/// Durable outcome of one classification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Frame identifier from the producer
    pub id: String,
    /// Verdict, or `None` when classification failed
    pub detection: Option<String>,
    /// Completion time in epoch milliseconds (UTC)
    pub timestamp: i64,
}

impl DetectionRecord {
    /// Create a record stamped with the current time
    pub fn now(id: impl Into<String>, detection: Option<String>) -> Self {
        Self {
            id: id.into(),
            detection,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
