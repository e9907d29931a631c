//! Relay gateway
//!
//! Orchestrates every inbound event. The gateway owns the producer registry
//! and runs on a single task; classification work is pushed onto
//! independent tasks so the raw relay never waits on it.
//!
//! # Architecture
//!
//! ```text
//!   [connection] ──┐                                  ┌──► [connection]
//!   [connection] ──┼─► mpsc ─► RelayGateway ─► broadcast ──► [connection]
//!   [connection] ──┘              │       ▲           └──► [connection]
//!                                 │       │
//!                      tokio::spawn per frame
//!                                 ▼       │
//!                          Classifier ─► DetectionLogWriter ─► detection
//! ```
//!
//! Per frame: validate, update the registry (status broadcast on a new
//! producer), broadcast `stream`, spawn classification. The spawned task
//! appends the record and broadcasts `detection` when the classifier
//! finishes. Detections may arrive out of frame order.

pub mod handle;
pub mod relay;

pub use handle::{GatewayHandle, GatewayStatus, Subscription, DEFAULT_COMMAND_CAPACITY};
pub use relay::{FrameDisposition, RelayGateway, DEFAULT_BROADCAST_CAPACITY};
