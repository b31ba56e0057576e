//! Core error types for the Kestrel orchestration client
//!
//! These errors are shared by every language binding of the client. The Rust
//! SDK wraps them in its own error type.

use crate::graph::GraphError;

/// Core error type for gRPC client operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// gRPC communication error
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Graph failed validation before leaving the process
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// The gRPC status code, when this error came from the wire.
    pub fn status_code(&self) -> Option<tonic::Code> {
        match self {
            Self::Grpc(status) => Some(status.code()),
            _ => None,
        }
    }
}
