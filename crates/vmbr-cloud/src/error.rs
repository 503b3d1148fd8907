//! Error types for the cloud client layer.

use thiserror::Error;

/// Errors produced by the compute/image service client and the polling
/// primitives built on top of it.
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP transport failure (connection, TLS, body decoding).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered 404 for a resource that was asked for by id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service rejected or failed a submitted operation.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered 2xx but the payload is missing required fields.
    #[error("malformed response from the service: {0}")]
    Malformed(String),

    /// The run was cancelled while waiting on a remote transition.
    #[error("operation cancelled")]
    Cancelled,
}
