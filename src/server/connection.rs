//! Per-connection WebSocket session
//!
//! Each accepted socket runs one loop that forwards gateway broadcasts to
//! the client and feeds the client's events to the gateway. Text messages
//! carry JSON event envelopes; binary messages are ignored.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::Result;
use crate::gateway::{GatewayHandle, Subscription};
use crate::protocol::{InboundEvent, OutboundEvent};
use crate::session::{ConnectionId, SessionContext};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// Drive one connection until the client leaves or the gateway stops
///
/// The gateway is always told about the disconnect, whatever ended the
/// session.
pub(crate) async fn run(socket: WebSocket, ctx: SessionContext, gateway: GatewayHandle) -> Result<()> {
    let conn = ctx.id;
    let (mut ws_tx, ws_rx) = socket.split();

    let Subscription { status, events } = gateway.connect(ctx).await?;

    let result = match send_event(&mut ws_tx, &OutboundEvent::StreamStatus(status)).await {
        Ok(()) => pump(conn, &gateway, ws_tx, ws_rx, events).await,
        Err(e) => Err(e),
    };

    gateway.disconnect(conn).await?;
    result
}

async fn pump(
    conn: ConnectionId,
    gateway: &GatewayHandle,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut events: broadcast::Receiver<OutboundEvent>,
) -> Result<()> {
    loop {
        tokio::select! {
            // Forward broadcasts to this client
            result = events.recv() => {
                match result {
                    Ok(event) => send_event(&mut ws_tx, &event).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(conn = %conn, skipped = skipped, "Client lagged, events skipped");
                    }
                    Err(RecvError::Closed) => return Ok(()),
                }
            }
            // Handle messages from this client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_text(gateway, conn, &text).await?,
                    Some(Ok(Message::Ping(data))) => ws_tx.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(conn = %conn, bytes = data.len(), "Ignoring binary message");
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn, error = %e, "WebSocket receive failed");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn handle_text(gateway: &GatewayHandle, conn: ConnectionId, text: &str) -> Result<()> {
    match InboundEvent::parse(text) {
        Ok(InboundEvent::VideoFrame(payload)) => gateway.frame(conn, payload).await?,
        Ok(InboundEvent::Unknown(event)) => {
            tracing::debug!(conn = %conn, event = %event, "Ignoring unknown event");
        }
        Err(e) => {
            tracing::warn!(conn = %conn, error = %e, "Ignoring malformed message");
        }
    }
    Ok(())
}

async fn send_event(ws_tx: &mut WsSink, event: &OutboundEvent) -> Result<()> {
    let text = event.to_json()?;
    ws_tx.send(Message::Text(text)).await?;
    Ok(())
}
