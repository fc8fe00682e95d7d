//! Error types shared across the host and renderer halves.

use std::path::PathBuf;

/// Failures talking to the loopback backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection refused, DNS, TLS, or any other transport-level failure.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The request exceeded the configured timeout.
    #[error("backend timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}")]
    Status { status: u16 },

    /// The body could not be decoded into the expected shape.
    #[error("malformed backend response: {0}")]
    Decode(String),

    /// The worker thread carrying the request went away before replying.
    #[error("backend request was dropped before completing")]
    Dropped,
}

impl BackendError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout { timeout_secs }
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
            }
        } else {
            BackendError::Unreachable(err.to_string())
        }
    }
}

/// Failures loading the JSON config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures starting a backend worker process.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no backend command configured")]
    NotConfigured,
}
