//! Error types for tcpsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Probe failures never
//! escape the scanner; they are folded into a [`ProbeOutcome`] there.
//!
//! [`ProbeOutcome`]: crate::types::ProbeOutcome

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Why a single connection attempt did not complete.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("connection failed: {0}")]
    ConnectionFailed(#[from] std::io::Error),
}

/// Invalid configuration, detected before any probe is sent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("invalid loop policy: {0}")]
    InvalidLoopPolicy(String),

    #[error("invalid thread count: {0}")]
    InvalidThreads(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("listen mode requires an explicit --ports value")]
    ListenRequiresPorts,

    #[error("could not determine the configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),
}

/// Top-level error for a command-line run.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PortError> for CliError {
    fn from(e: PortError) -> Self {
        Self::Config(ConfigError::Port(e))
    }
}

/// Result type alias for configuration building.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for command execution.
pub type CliResult<T> = Result<T, CliError>;
