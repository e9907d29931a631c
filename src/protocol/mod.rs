//! Wire protocol for the relay channel
//!
//! - `event`: JSON event envelope, inbound and outbound event types
//! - `payload`: frame payload type and its structural validator

pub mod event;
pub mod payload;

pub use event::{DetectionEvent, InboundEvent, OutboundEvent, StreamStatus};
pub use payload::{validate_frame_payload, FramePayload};
