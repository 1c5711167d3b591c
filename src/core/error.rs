//! Failure taxonomy for calls to the monitoring backend

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request to {path} timed out")]
    Timeout { path: String },

    #[error("Could not reach {path}: {message}")]
    Connection { path: String, message: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("{path} rejected the request with status {status}")]
    Rejected { path: String, status: u16 },

    #[error("{path} failed with status {status} after {attempts} attempt(s)")]
    Server {
        path: String,
        status: u16,
        attempts: u32,
    },

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl TransportError {
    pub fn path(&self) -> &str {
        match self {
            TransportError::Timeout { path }
            | TransportError::Connection { path, .. }
            | TransportError::NotFound { path }
            | TransportError::Rejected { path, .. }
            | TransportError::Server { path, .. }
            | TransportError::Decode { path, .. } => path,
        }
    }

    /// Whether the failure came from the network rather than from a response.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. } | TransportError::Connection { .. }
        )
    }
}
