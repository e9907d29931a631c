//! Connection state machine
//!
//! ```text
//! Connected ──first valid frame──► Producing ──close──► Disconnected
//!     │                                                     ▲
//!     └───────────────────────close─────────────────────────┘
//! ```
//!
//! A producer stays a producer until it disconnects. `Disconnected` is
//! terminal.

use std::time::Duration;

use super::context::SessionContext;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, has not sent a valid frame
    Connected,
    /// Has sent at least one valid frame
    Producing,
    /// Connection closed
    Disconnected,
}

/// Per-connection state tracked by the gateway
#[derive(Debug)]
pub struct SessionState {
    /// Connection identity
    pub context: SessionContext,

    /// Current phase
    pub phase: SessionPhase,

    /// Valid frames relayed from this connection
    pub frames_relayed: u64,

    /// Malformed frames discarded from this connection
    pub frames_rejected: u64,
}

impl SessionState {
    /// Create state for a freshly accepted connection
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            phase: SessionPhase::Connected,
            frames_relayed: 0,
            frames_rejected: 0,
        }
    }

    /// Record a relayed frame, promoting the connection to producer
    pub fn on_frame(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Producing;
        }
        if self.phase == SessionPhase::Producing {
            self.frames_relayed += 1;
        }
    }

    /// Record a discarded frame
    pub fn on_rejected(&mut self) {
        self.frames_rejected += 1;
    }

    /// Close the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Disconnected;
    }

    /// Check if the connection is a producer
    pub fn is_producing(&self) -> bool {
        self.phase == SessionPhase::Producing
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.context.connected_at.elapsed()
    }
}
