//! Provider error types

use thiserror::Error;

/// Errors that can occur while fetching a tile from the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection or transfer failed before a complete response arrived
    #[error("HTTP error: {0}")]
    Network(String),

    /// The request did not complete within its deadline
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The client could not be constructed or the request could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ProviderError {
    /// Short category name used in logs and failure summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Status { .. } => "status",
            ProviderError::Client(_) => "client",
        }
    }
}
