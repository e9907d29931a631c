//! Relay server listener
//!
//! Binds the HTTP listener, upgrades WebSocket requests and spawns the
//! gateway and detection log tasks that connections share.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::classifier::{Classifier, ProcessClassifier};
use crate::error::Result;
use crate::gateway::{GatewayHandle, GatewayStatus, RelayGateway};
use crate::server::config::ServerConfig;
use crate::server::connection;
use crate::session::{ConnectionId, SessionContext};
use crate::stats::{RelayStats, RelayStatsSnapshot};
use crate::store::{DetectionLog, DetectionLogWriter, DEFAULT_QUEUE_CAPACITY};

/// Frame relay server
pub struct RelayServer<C: Classifier> {
    config: ServerConfig,
    classifier: C,
    stats: Arc<RelayStats>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer<ProcessClassifier> {
    /// Create a server that runs the configured classifier executable
    pub fn from_config(config: ServerConfig) -> Self {
        let classifier = ProcessClassifier::new(config.classifier.clone());
        Self::with_classifier(config, classifier)
    }
}

impl<C: Classifier> RelayServer<C> {
    /// Create a server with a custom classifier
    pub fn with_classifier(config: ServerConfig, classifier: C) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            classifier,
            stats: Arc::new(RelayStats::new()),
            connection_semaphore,
        }
    }

    /// Get the relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;

        let log = DetectionLog::new(self.config.detection_log_path.clone());
        let (detections, writer_task) = DetectionLogWriter::spawn(log, DEFAULT_QUEUE_CAPACITY);

        let (gateway, gateway_task) =
            RelayGateway::new(self.classifier, detections, self.config.broadcast_capacity)
                .with_stats(Arc::clone(&self.stats))
                .spawn(self.config.command_capacity);

        let state = Arc::new(AppState {
            gateway,
            stats: Arc::clone(&self.stats),
            next_connection_id: AtomicU64::new(1),
            connection_semaphore: self.connection_semaphore.clone(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/status", get(status_handler))
            .with_state(state);

        if let Some(dir) = &self.config.static_dir {
            app = app.fallback_service(ServeDir::new(dir));
        }

        let app = app.layer(CorsLayer::permissive());

        tracing::info!(
            addr = %addr,
            detection_log = %self.config.detection_log_path.display(),
            classifier = %self.config.classifier.program.display(),
            "Relay server listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

        // Open sockets keep the gateway alive; stop it so queued appends drain
        gateway_task.abort();
        let _ = gateway_task.await;
        let _ = writer_task.await;

        Ok(())
    }
}

struct AppState {
    gateway: GatewayHandle,
    stats: Arc<RelayStats>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Check connection limit
    let permit = if let Some(ref sem) = state.connection_semaphore {
        match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
            }
        }
    } else {
        None
    };

    let conn = ConnectionId(state.next_connection_id.fetch_add(1, Ordering::Relaxed));

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let ctx = SessionContext::new(conn, peer_addr);

        tracing::debug!(conn = %conn, peer = %peer_addr, "New connection");
        state.stats.connection_opened();

        if let Err(e) = connection::run(socket, ctx, state.gateway.clone()).await {
            tracing::debug!(conn = %conn, error = %e, "Connection error");
        }

        state.stats.connection_closed();
        tracing::debug!(conn = %conn, "Connection closed");
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    gateway: GatewayStatus,
    stats: RelayStatsSnapshot,
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<StatusResponse>, StatusCode> {
    let gateway = state
        .gateway
        .status()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(StatusResponse {
        gateway,
        stats: state.stats.snapshot(),
    }))
}
