//! Connection context
//!
//! Identity information for a connected party, created by the server when
//! a WebSocket is accepted and passed to the gateway.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Opaque identifier of one connection
///
/// Allocated from a monotonically increasing counter and never reused
/// within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Context describing a connected party
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique connection ID
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// When the connection was accepted
    pub connected_at: Instant,
}

impl SessionContext {
    /// Create a new context
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
        }
    }
}
