//! Error types for the transfer layer.

use thiserror::Error;

/// Errors produced by the transfer backend and coordinator.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Source or destination location is missing required fields. Raised
    /// before anything is submitted to the backend.
    #[error("transfer not configured: {0}")]
    NotConfigured(String),

    /// HTTP transport failure talking to the backend daemon.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered an RPC with a non-success status.
    #[error("{op} failed (status {status}): {message}")]
    Rpc {
        op: String,
        status: u16,
        message: String,
    },

    /// The copy job reached its terminal state with failure.
    #[error("transfer job failed after {duration:.2}s: {detail}")]
    JobFailed { detail: String, duration: f64 },

    /// The object never appeared within the deadline.
    #[error("timed out waiting for object to appear: {key}")]
    Timeout { key: String },

    /// The run was cancelled while a transfer operation was in flight.
    #[error("operation cancelled")]
    Cancelled,
}
