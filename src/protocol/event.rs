//! Event envelope for the bidirectional channel
//!
//! Every message on the wire is one JSON envelope naming an event and
//! carrying its payload:
//!
//! ```text
//! {"event": "video-frame",   "data": {"id": "...", "frame": "..."}}   client → relay
//! {"event": "stream-status", "data": {"active": true}}                relay → client
//! {"event": "stream",        "data": {"id": "...", "frame": "..."}}   relay → clients
//! {"event": "detection",     "data": {"id": "...", "detection": null}} relay → clients
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payload::FramePayload;

/// Inbound frame event name
pub const VIDEO_FRAME: &str = "video-frame";
/// Outbound producer status event name
pub const STREAM_STATUS: &str = "stream-status";
/// Outbound raw frame relay event name
pub const STREAM: &str = "stream";
/// Outbound classification result event name
pub const DETECTION: &str = "detection";

/// Aggregate stream status: whether any producer is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub active: bool,
}

impl StreamStatus {
    pub fn new(active: bool) -> Self {
        Self { active }
    }
}

/// Classification result for one frame
///
/// `detection` is `None` when classification failed or produced no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: String,
    pub detection: Option<String>,
}

/// Events sent from the relay to connected parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    /// Producer status (sent on connect and on status transitions)
    #[serde(rename = "stream-status")]
    StreamStatus(StreamStatus),
    /// Raw frame relayed verbatim
    #[serde(rename = "stream")]
    Stream(FramePayload),
    /// Classification outcome
    #[serde(rename = "detection")]
    Detection(DetectionEvent),
}

impl OutboundEvent {
    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::StreamStatus(_) => STREAM_STATUS,
            OutboundEvent::Stream(_) => STREAM,
            OutboundEvent::Detection(_) => DETECTION,
        }
    }

    /// Encode as a JSON text envelope
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Events received from a connected party
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Candidate frame; the payload is untyped until validated
    VideoFrame(Value),
    /// Any event name this relay does not handle
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl InboundEvent {
    /// Decode a JSON text envelope
    ///
    /// Fails only when the text is not JSON or has no string `event` member.
    /// The payload itself is not checked here.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;

        Ok(match envelope.event.as_str() {
            VIDEO_FRAME => InboundEvent::VideoFrame(envelope.data),
            _ => InboundEvent::Unknown(envelope.event),
        })
    }
}
