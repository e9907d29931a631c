//! Gateway event loop
//!
//! Connections talk to the gateway through a [`GatewayHandle`]. Commands
//! are queued on one mpsc channel and applied in arrival order by a single
//! task that owns the [`RelayGateway`], which gives the one-at-a-time
//! processing the producer registry relies on.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::protocol::{OutboundEvent, StreamStatus};
use crate::session::{ConnectionId, SessionContext};

use super::relay::RelayGateway;

/// Default depth of the gateway command queue
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

const GATEWAY_NAME: &str = "relay gateway";

/// Snapshot of gateway state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub active: bool,
    pub producers: usize,
    pub connections: usize,
}

/// Subscription handed to a newly connected party
pub struct Subscription {
    /// Status to send to this party immediately
    pub status: StreamStatus,
    /// Every broadcast from this point on
    pub events: broadcast::Receiver<OutboundEvent>,
}

enum GatewayCommand {
    Connect {
        ctx: SessionContext,
        reply: oneshot::Sender<Subscription>,
    },
    Frame {
        conn: ConnectionId,
        payload: Value,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Status {
        reply: oneshot::Sender<GatewayStatus>,
    },
}

impl<C: Classifier> RelayGateway<C> {
    /// Move the gateway onto its own task
    ///
    /// The task exits when every handle has been dropped.
    pub fn spawn(self, capacity: usize) -> (GatewayHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(self.run(rx));

        (GatewayHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<GatewayCommand>) {
        tracing::debug!("Relay gateway started");

        while let Some(command) = rx.recv().await {
            match command {
                GatewayCommand::Connect { ctx, reply } => {
                    // Subscribe here so no status change can slip in between
                    // the snapshot and the subscription
                    let events = self.subscribe();
                    let status = self.on_connect(ctx);
                    let _ = reply.send(Subscription { status, events });
                }
                GatewayCommand::Frame { conn, payload } => {
                    self.on_frame(conn, &payload);
                }
                GatewayCommand::Disconnect { conn } => {
                    self.on_disconnect(conn);
                }
                GatewayCommand::Status { reply } => {
                    let _ = reply.send(GatewayStatus {
                        active: self.status().active,
                        producers: self.producer_count(),
                        connections: self.connection_count(),
                    });
                }
            }
        }

        tracing::debug!("Relay gateway stopped");
    }
}

/// Cloneable handle to the gateway event loop
#[derive(Clone)]
pub struct GatewayHandle {
    tx: mpsc::Sender<GatewayCommand>,
}

impl GatewayHandle {
    /// Register a connection and subscribe it to broadcasts
    pub async fn connect(&self, ctx: SessionContext) -> Result<Subscription> {
        let (reply, rx) = oneshot::channel();
        self.send(GatewayCommand::Connect { ctx, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed(GATEWAY_NAME))
    }

    /// Queue an inbound frame payload from `conn`
    pub async fn frame(&self, conn: ConnectionId, payload: Value) -> Result<()> {
        self.send(GatewayCommand::Frame { conn, payload }).await
    }

    /// Report that `conn` closed
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<()> {
        self.send(GatewayCommand::Disconnect { conn }).await
    }

    /// Query producer and connection counts
    pub async fn status(&self) -> Result<GatewayStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(GatewayCommand::Status { reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed(GATEWAY_NAME))
    }

    async fn send(&self, command: GatewayCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed(GATEWAY_NAME))
    }
}
