//! Error types for the webhook process

use thiserror::Error;

/// Main error type for process-level operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS material could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// The listener failed
    #[error("server error: {0}")]
    Server(String),

    /// Logging could not be initialized
    #[error("telemetry error: {0}")]
    Telemetry(#[from] crate::telemetry::TelemetryError),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a TLS error with the given message
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
