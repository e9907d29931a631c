//! Producer registry implementation

use std::collections::HashSet;

use crate::session::ConnectionId;

/// Set of connections currently acting as video sources
///
/// A connection is a member iff it has sent at least one valid frame since
/// connecting and has not disconnected since. The registry is owned by the
/// gateway event loop, so it needs no internal locking.
#[derive(Debug, Default)]
pub struct ProducerRegistry {
    producers: HashSet<ConnectionId>,
}

impl ProducerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a new connection
    ///
    /// Connecting alone never makes a producer, so membership is unchanged.
    pub fn record_connect(&mut self, conn: ConnectionId) {
        tracing::trace!(conn = %conn, producers = self.len(), "Connection noted");
    }

    /// Record a valid frame from `conn`
    ///
    /// Returns true iff this was the connection's first valid frame.
    pub fn record_frame(&mut self, conn: ConnectionId) -> bool {
        let inserted = self.producers.insert(conn);
        if inserted {
            tracing::info!(conn = %conn, producers = self.len(), "Producer registered");
        }
        inserted
    }

    /// Record that `conn` disconnected
    ///
    /// Returns true iff removing it left the registry empty.
    pub fn record_disconnect(&mut self, conn: ConnectionId) -> bool {
        if !self.producers.remove(&conn) {
            return false;
        }

        tracing::info!(conn = %conn, producers = self.len(), "Producer removed");
        self.producers.is_empty()
    }

    /// Whether any producer is live
    pub fn is_active(&self) -> bool {
        !self.producers.is_empty()
    }

    /// Number of live producers
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Check if there are no producers
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Check if `conn` is a producer
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.producers.contains(&conn)
    }
}
