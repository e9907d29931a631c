//! Classifier configuration

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the classifier executable
pub const CLASSIFIER_PATH_ENV: &str = "CLASSIFIER_PATH";

/// Classifier executable used when no override is set
pub const DEFAULT_CLASSIFIER_PATH: &str = "./classifier";

/// Upper bound on captured classifier output (1 MiB)
pub const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024;

/// Per-call classifier timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to invoke the external classifier
///
/// Resolved once at startup and moved into the classifier; it is never
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Executable to launch
    pub program: PathBuf,

    /// Arguments placed before the encoded frame (e.g. a script path)
    pub leading_args: Vec<OsString>,

    /// Kill the child and fail the call after this long
    pub timeout: Duration,

    /// Maximum stdout bytes accepted as a result
    pub max_output: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_CLASSIFIER_PATH),
            leading_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl ClassifierConfig {
    /// Create a config for the given executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Resolve the executable from `CLASSIFIER_PATH`, falling back to the default
    pub fn from_env() -> Self {
        match std::env::var_os(CLASSIFIER_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }

    /// Add an argument placed before the frame
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    /// Set the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the output bound
    pub fn max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }
}
