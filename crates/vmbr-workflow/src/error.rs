//! Workflow-level errors: every fatal condition carries enough context
//! (resource id, step) to diagnose a failed run from the message alone.

use std::time::Duration;

use thiserror::Error;

use vmbr_cloud::CloudError;
use vmbr_transfer::TransferError;

/// Errors that abort a backup or restore run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No server matched the configured name.
    #[error("no server found with name {0:?}")]
    ServerNotFound(String),

    /// More than one resource matched a name that must be unique.
    #[error("ambiguous {resource} name {name:?}: {count} matches")]
    AmbiguousName {
        resource: &'static str,
        name: String,
        count: usize,
    },

    /// A polled resource stayed pending past its deadline.
    #[error("{resource} {id} did not become {expected} within {timeout:?}")]
    WaitTimeout {
        resource: &'static str,
        id: String,
        expected: &'static str,
        timeout: Duration,
    },

    /// A polled resource reached a terminal failure state.
    #[error("{resource} {id} failed while waiting to become {expected}: {detail}")]
    ResourceFailed {
        resource: &'static str,
        id: String,
        expected: &'static str,
        detail: String,
    },

    /// The cloud API failed during a named step.
    #[error("step {step:?} failed: {source}")]
    Cloud {
        step: &'static str,
        #[source]
        source: CloudError,
    },

    /// The transfer layer failed during a named step.
    #[error("step {step:?} failed: {source}")]
    Transfer {
        step: &'static str,
        #[source]
        source: TransferError,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

impl WorkflowError {
    /// Wrap a cloud error with step context, folding cancellation into the
    /// dedicated variant.
    pub(crate) fn cloud(step: &'static str, source: CloudError) -> Self {
        match source {
            CloudError::Cancelled => Self::Cancelled,
            other => Self::Cloud { step, source: other },
        }
    }

    /// Wrap a transfer error with step context, folding cancellation into
    /// the dedicated variant.
    pub(crate) fn transfer(step: &'static str, source: TransferError) -> Self {
        match source {
            TransferError::Cancelled => Self::Cancelled,
            other => Self::Transfer {
                step,
                source: other,
            },
        }
    }
}
