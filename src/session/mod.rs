//! Connection sessions
//!
//! Identity and lifecycle state of each connected party.

pub mod context;
pub mod state;

pub use context::{ConnectionId, SessionContext};
pub use state::{SessionPhase, SessionState};
