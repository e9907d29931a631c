//! Error types
//!
//! Crate-wide error type for relay, storage and server operations.
//! Classifier failures have their own type (`ClassifyError`) because they
//! are folded into a null detection rather than propagated.

use std::fmt;
use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug)]
pub enum Error {
    /// Filesystem or socket I/O failure
    Io(io::Error),
    /// JSON encoding or decoding failure
    Json(serde_json::Error),
    /// WebSocket send or receive failure
    WebSocket(axum::Error),
    /// An internal task went away (gateway loop, log writer)
    ChannelClosed(&'static str),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::ChannelClosed(name) => write!(f, "{} is no longer running", name),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::ChannelClosed(_) | Error::Config(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<axum::Error> for Error {
    fn from(e: axum::Error) -> Self {
        Error::WebSocket(e)
    }
}
