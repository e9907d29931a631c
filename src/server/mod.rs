//! HTTP and WebSocket server
//!
//! - `config`: listener, fan-out and storage settings
//! - `connection`: per-socket event loop
//! - `listener`: axum router and server lifecycle

pub mod config;
pub(crate) mod connection;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT, DEFAULT_STATIC_DIR};
pub use listener::RelayServer;
