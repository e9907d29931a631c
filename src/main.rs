//! frame-relay - WebSocket video frame relay with per-frame classification

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use frame_relay::classifier::{ClassifierConfig, DEFAULT_MAX_OUTPUT, DEFAULT_TIMEOUT};
use frame_relay::gateway::DEFAULT_BROADCAST_CAPACITY;
use frame_relay::server::{DEFAULT_PORT, DEFAULT_STATIC_DIR};
use frame_relay::store::DEFAULT_DETECTION_LOG_PATH;
use frame_relay::{RelayServer, Result, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Relay video frames over WebSocket and classify each one")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    bind: SocketAddr,

    /// Classifier executable; receives the encoded frame as its last argument.
    /// Defaults to $CLASSIFIER_PATH, then ./classifier
    #[arg(long)]
    classifier: Option<PathBuf>,

    /// Argument passed to the classifier before the frame (repeatable)
    #[arg(long = "classifier-arg", allow_hyphen_values = true)]
    classifier_args: Vec<String>,

    /// Kill a classifier call after this many milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    classifier_timeout_ms: u64,

    /// Maximum classifier output in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT)]
    max_output: usize,

    /// Detection log file
    #[arg(long, env = "DETECTION_LOG", default_value = DEFAULT_DETECTION_LOG_PATH)]
    detection_log: PathBuf,

    /// Directory served over HTTP
    #[arg(long, default_value = DEFAULT_STATIC_DIR)]
    static_dir: PathBuf,

    /// Do not serve static files
    #[arg(long)]
    no_static: bool,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Events buffered per client before a slow client skips ahead
    #[arg(long, default_value_t = DEFAULT_BROADCAST_CAPACITY)]
    broadcast_capacity: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut classifier = ClassifierConfig::from_env()
            .timeout(Duration::from_millis(self.classifier_timeout_ms))
            .max_output(self.max_output);
        if let Some(program) = self.classifier {
            classifier.program = program;
        }
        for arg in self.classifier_args {
            classifier = classifier.arg(arg);
        }

        let config = ServerConfig::with_addr(self.bind)
            .max_connections(self.max_connections)
            .broadcast_capacity(self.broadcast_capacity)
            .detection_log_path(self.detection_log)
            .classifier(classifier);

        if self.no_static {
            config.disable_static_files()
        } else {
            config.static_dir(self.static_dir)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frame_relay=info")),
        )
        .init();

    let config = Args::parse().into_config();

    tracing::info!(
        classifier = %config.classifier.program.display(),
        timeout_ms = config.classifier.timeout.as_millis() as u64,
        "Frame relay starting"
    );

    RelayServer::from_config(config)
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_debug_assert() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_match_server_defaults() {
        let config = Args::try_parse_from(["frame-relay"]).unwrap().into_config();
        let defaults = ServerConfig::default();

        assert_eq!(config.bind_addr, defaults.bind_addr);
        assert_eq!(config.max_connections, defaults.max_connections);
        assert_eq!(config.broadcast_capacity, defaults.broadcast_capacity);
        assert_eq!(config.detection_log_path, defaults.detection_log_path);
        assert_eq!(config.static_dir, defaults.static_dir);
        assert_eq!(config.classifier.timeout, defaults.classifier.timeout);
        assert_eq!(config.classifier.max_output, defaults.classifier.max_output);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Args::try_parse_from([
            "frame-relay",
            "--bind",
            "127.0.0.1:8080",
            "--classifier",
            "python3",
            "--classifier-arg",
            "classify.py",
            "--classifier-timeout-ms",
            "500",
            "--no-static",
        ])
        .unwrap()
        .into_config();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.classifier.program, PathBuf::from("python3"));
        assert_eq!(
            config.classifier.leading_args,
            vec![std::ffi::OsString::from("classify.py")]
        );
        assert_eq!(config.classifier.timeout, Duration::from_millis(500));
        assert!(config.static_dir.is_none());
    }
}
