//! Detection log persistence
//!
//! Classification outcomes are appended to a JSON file that doubles as a
//! debuggable audit trail. The file is rewritten in full on every append,
//! which is fine for a single relay process but does not scale to large
//! logs.
//!
//! - `record`: the persisted record type
//! - `log`: file load and append
//! - `writer`: single-writer task serializing concurrent appends

pub mod log;
pub mod record;
pub mod writer;

pub use log::{DetectionLog, DEFAULT_DETECTION_LOG_PATH};
pub use record::DetectionRecord;
pub use writer::{DetectionLogHandle, DetectionLogWriter, DEFAULT_QUEUE_CAPACITY};
