//! Real-time video frame relay with per-frame classification
//!
//! Clients connect over a WebSocket. Any client that sends a `video-frame`
//! event becomes a producer; every frame is rebroadcast to all connected
//! clients as a `stream` event and handed to an external classifier. The
//! classifier's verdict is appended to a JSON detection log and broadcast as
//! a `detection` event. A `stream-status` event tells clients whether any
//! producer is live.
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::{RelayServer, ServerConfig};
//!
//! # async fn run() -> frame_relay::Result<()> {
//! let config = ServerConfig::default().detection_log_path("static/detection.json");
//! RelayServer::from_config(config)
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

pub mod classifier;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;

pub use classifier::{Classifier, ClassifierConfig, ClassifyError, ProcessClassifier};
pub use error::{Error, Result};
pub use server::{RelayServer, ServerConfig};
