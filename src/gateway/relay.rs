//! Relay gateway core
//!
//! Synchronous connection and frame handling. The gateway is owned by a
//! single event loop (see `handle`), so registry updates and status
//! broadcasts never race. Classification, log append and the detection
//! broadcast run on a separate task per frame and may complete in any
//! order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::classifier::Classifier;
use crate::protocol::{validate_frame_payload, DetectionEvent, FramePayload, OutboundEvent, StreamStatus};
use crate::registry::ProducerRegistry;
use crate::session::{ConnectionId, SessionContext, SessionState};
use crate::stats::RelayStats;
use crate::store::{DetectionLogHandle, DetectionRecord};

/// Default capacity of the fan-out channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// What happened to an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Malformed payload or unknown connection, discarded without side effects
    Rejected,
    /// Broadcast and dispatched for classification
    Relayed {
        /// This was the connection's first valid frame
        new_producer: bool,
    },
}

/// Orchestrates validation, producer tracking, relay and classification
pub struct RelayGateway<C: Classifier> {
    producers: ProducerRegistry,
    sessions: HashMap<ConnectionId, SessionState>,
    events: broadcast::Sender<OutboundEvent>,
    classifier: Arc<C>,
    detections: DetectionLogHandle,
    stats: Arc<RelayStats>,
}

impl<C: Classifier> RelayGateway<C> {
    /// Create a gateway with its own fan-out channel
    pub fn new(classifier: C, detections: DetectionLogHandle, broadcast_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity.max(1));

        Self {
            producers: ProducerRegistry::new(),
            sessions: HashMap::new(),
            events,
            classifier: Arc::new(classifier),
            detections,
            stats: Arc::new(RelayStats::new()),
        }
    }

    /// Share an existing stats instance
    pub fn with_stats(mut self, stats: Arc<RelayStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Get the relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Subscribe to every outbound broadcast
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.events.subscribe()
    }

    /// Current aggregate status
    pub fn status(&self) -> StreamStatus {
        StreamStatus::new(self.producers.is_active())
    }

    /// Number of live producers
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Get the state of an open connection
    pub fn session(&self, conn: ConnectionId) -> Option<&SessionState> {
        self.sessions.get(&conn)
    }

    /// Register a new connection
    ///
    /// Returns the status to send to that connection only. Nothing is
    /// broadcast.
    pub fn on_connect(&mut self, ctx: SessionContext) -> StreamStatus {
        let conn = ctx.id;
        tracing::info!(conn = %conn, peer = %ctx.peer_addr, "Client connected");

        self.producers.record_connect(conn);
        self.sessions.insert(conn, SessionState::new(ctx));
        self.status()
    }

    /// Handle one inbound `video-frame` payload
    ///
    /// Frames from a connection that was never registered, or has already
    /// disconnected, are rejected so the producer set only holds live
    /// sessions.
    pub fn on_frame(&mut self, conn: ConnectionId, raw: &Value) -> FrameDisposition {
        if !self.sessions.contains_key(&conn) {
            tracing::warn!(conn = %conn, "Frame from unknown connection discarded");
            self.stats.frame_rejected();
            return FrameDisposition::Rejected;
        }

        let Some(payload) = validate_frame_payload(raw) else {
            tracing::warn!(conn = %conn, payload = %truncated(raw), "Invalid frame payload discarded");
            self.stats.frame_rejected();
            if let Some(session) = self.sessions.get_mut(&conn) {
                session.on_rejected();
            }
            return FrameDisposition::Rejected;
        };

        let new_producer = self.producers.record_frame(conn);
        if new_producer {
            self.broadcast(OutboundEvent::StreamStatus(StreamStatus::new(true)));
        }
        if let Some(session) = self.sessions.get_mut(&conn) {
            session.on_frame();
        }

        // Relay before classifying so viewers never wait on the model
        self.broadcast(OutboundEvent::Stream(payload.clone()));
        self.stats.frame_relayed();

        tracing::trace!(conn = %conn, frame_id = %payload.id, bytes = payload.frame.len(), "Frame relayed");

        tokio::spawn(classify_and_record(
            Arc::clone(&self.classifier),
            payload,
            self.detections.clone(),
            self.events.clone(),
            Arc::clone(&self.stats),
        ));

        FrameDisposition::Relayed { new_producer }
    }

    /// Handle a closed connection
    pub fn on_disconnect(&mut self, conn: ConnectionId) {
        if let Some(mut session) = self.sessions.remove(&conn) {
            session.close();
            tracing::info!(
                conn = %conn,
                frames = session.frames_relayed,
                rejected = session.frames_rejected,
                duration_secs = session.duration().as_secs(),
                "Client disconnected"
            );
        }

        if self.producers.record_disconnect(conn) {
            self.broadcast(OutboundEvent::StreamStatus(StreamStatus::new(false)));
        }
    }

    fn broadcast(&self, event: OutboundEvent) {
        // Err only means nobody is listening right now
        let _ = self.events.send(event);
    }
}

/// Classify one frame, log the outcome, then broadcast it
///
/// Runs detached from the gateway. A disconnect of the producer does not
/// cancel it.
async fn classify_and_record<C: Classifier>(
    classifier: Arc<C>,
    payload: FramePayload,
    detections: DetectionLogHandle,
    events: broadcast::Sender<OutboundEvent>,
    stats: Arc<RelayStats>,
) {
    let detection = match classifier.classify(Arc::clone(&payload.frame)).await {
        Ok(verdict) => {
            tracing::debug!(frame_id = %payload.id, detection = %verdict, "Frame classified");
            Some(verdict)
        }
        Err(e) => {
            tracing::warn!(frame_id = %payload.id, error = %e, "Classification failed");
            None
        }
    };

    let record = DetectionRecord::now(payload.id.clone(), detection.clone());
    if let Err(e) = detections.append(record).await {
        tracing::error!(frame_id = %payload.id, error = %e, "Failed to append detection record");
        stats.log_write_failed();
    }

    stats.detection(detection.is_none());
    let _ = events.send(OutboundEvent::Detection(DetectionEvent {
        id: payload.id,
        detection,
    }));
}

/// Short rendering of an untyped payload for logs
fn truncated(value: &Value) -> String {
    const MAX: usize = 120;

    let text = value.to_string();
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
