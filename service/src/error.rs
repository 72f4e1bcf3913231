//! Error types for the host service

use shared::StatusCode;
use thiserror::Error;

/// Errors reported by a transport request
///
/// All of these are transient from the service's point of view: they are
/// logged and counted, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No active connection")]
    NotConnected,
    #[error("Transport out of buffers")]
    NoBuffers,
    #[error("Request rejected (status {0})")]
    Rejected(StatusCode),
    #[error("Transport failed to initialize (err {0})")]
    InitFailed(i32),
}

impl TransportError {
    /// Status code to report for a refused request
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::Rejected(status) => *status,
            // Memory capacity exceeded
            TransportError::NoBuffers => StatusCode(0x07),
            // Unknown connection identifier
            TransportError::NotConnected => StatusCode(0x02),
            TransportError::InitFailed(_) => StatusCode(0x1F),
        }
    }
}

/// Errors that abort service startup
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Transport initialization failed: {0}")]
    TransportInit(#[source] TransportError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(&'static str),
}
