//! Inbound frame payload validation
//!
//! Frames arrive as untyped JSON. A payload is accepted only when it is an
//! object carrying string `id` and `frame` members; anything else is
//! discarded by the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single video frame as sent by a producer
///
/// `frame` is an opaquely encoded still image (typically base64). It is
/// reference counted so the relay broadcast and the classifier task share
/// one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePayload {
    /// Producer-chosen frame identifier
    pub id: String,
    /// Encoded image data
    pub frame: Arc<str>,
}

impl FramePayload {
    /// Create a new frame payload
    pub fn new(id: impl Into<String>, frame: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            frame: frame.into(),
        }
    }
}

/// Validate an untyped value as a [`FramePayload`]
///
/// Returns `None` for null, non-objects, and objects whose `id` or `frame`
/// is missing or not a string. Extra members are ignored.
pub fn validate_frame_payload(value: &Value) -> Option<FramePayload> {
    let object = value.as_object()?;
    let id = object.get("id")?.as_str()?;
    let frame = object.get("frame")?.as_str()?;

    Some(FramePayload::new(id, frame))
}
