//! Relay-wide counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Lock-free counters shared by the server, the gateway and its tasks
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    frames_relayed: AtomicU64,
    frames_rejected: AtomicU64,
    detections: AtomicU64,
    classification_failures: AtomicU64,
    log_write_failures: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            frames_relayed: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            detections: AtomicU64::new(0),
            classification_failures: AtomicU64::new(0),
            log_write_failures: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturate rather than wrap if a close is ever double counted
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn frame_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a broadcast detection; `failed` when the verdict is null
    pub fn detection(&self, failed: bool) {
        self.detections.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.classification_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn log_write_failed(&self) {
        self.log_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get time since the relay started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Read all counters into a plain snapshot
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            classification_failures: self.classification_failures.load(Ordering::Relaxed),
            log_write_failures: self.log_write_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    pub uptime_secs: u64,
    pub total_connections: u64,
    pub active_connections: u64,
    pub frames_relayed: u64,
    pub frames_rejected: u64,
    pub detections: u64,
    pub classification_failures: u64,
    pub log_write_failures: u64,
}
