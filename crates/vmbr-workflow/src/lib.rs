//! Backup and restore orchestration.
//!
//! Both workflows are strictly sequential compositions of the cloud and
//! transfer layers: locate resources, prune retained history, submit the
//! snapshot or upload, wait out the asynchronous transitions, and hand
//! the artifact across object stores when configured. A step failure
//! aborts the run; nothing is compensated or rolled back.

pub mod backup;
pub mod common;
pub mod error;
pub mod request;
pub mod restore;

#[cfg(test)]
mod testutil;

pub use backup::run_backup;
pub use common::{
    OBJECT_POLL_INTERVAL, OBJECT_WAIT_TIMEOUT, STATUS_POLL_INTERVAL, STATUS_WAIT_TIMEOUT,
};
pub use error::WorkflowError;
pub use request::{BackupRequest, RestoreRequest, TransferSpec, OS_TYPE};
pub use restore::run_restore;
