//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::classifier::ClassifierConfig;
use crate::gateway::{DEFAULT_BROADCAST_CAPACITY, DEFAULT_COMMAND_CAPACITY};
use crate::store::DEFAULT_DETECTION_LOG_PATH;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default directory served over HTTP
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Fan-out channel capacity; slower consumers skip events beyond this
    pub broadcast_capacity: usize,

    /// Gateway command queue depth
    pub command_capacity: usize,

    /// Detection log file
    pub detection_log_path: PathBuf,

    /// Directory served as static files (None = no static serving)
    pub static_dir: Option<PathBuf>,

    /// External classifier invocation
    pub classifier: ClassifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            detection_log_path: PathBuf::from(DEFAULT_DETECTION_LOG_PATH),
            static_dir: Some(PathBuf::from(DEFAULT_STATIC_DIR)),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the fan-out channel capacity
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Set the detection log path
    pub fn detection_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.detection_log_path = path.into();
        self
    }

    /// Set the static file directory
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Disable static file serving
    pub fn disable_static_files(mut self) -> Self {
        self.static_dir = None;
        self
    }

    /// Set the classifier invocation
    pub fn classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }
}
