//! Producer registry
//!
//! Tracks which connections are live video sources and derives the
//! aggregate stream-active flag from them.
//!
//! ```text
//!   video-frame (valid) ──► record_frame(conn) ──► true on first frame
//!   disconnect          ──► record_disconnect(conn) ──► true when set empties
//!                                   │
//!                                   ▼
//!                         is_active() = len() > 0
//! ```

pub mod producers;

pub use producers::ProducerRegistry;
