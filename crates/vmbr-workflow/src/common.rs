//! Helpers shared by the backup and restore orchestrators.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vmbr_cloud::WaitOutcome;
use vmbr_core::{Repository, RepositoryId};

use crate::error::WorkflowError;

/// Cadence of the tag/server status polls.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Deadline for a tag or server to reach its expected state.
pub const STATUS_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Cadence of the object-existence poll.
pub const OBJECT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Deadline for an exported/relayed object to become visible.
pub const OBJECT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Bail out if the run was cancelled. Called before every remote call.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<(), WorkflowError> {
    if cancel.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }
    Ok(())
}

/// Resolve a repository name against a listing.
///
/// Exactly one match returns its id; no match means "create new"; more
/// than one match is an error rather than a guess.
pub fn match_repository(
    repositories: &[Repository],
    name: &str,
) -> Result<Option<RepositoryId>, WorkflowError> {
    let mut matches = repositories.iter().filter(|r| r.name == name);
    let first = matches.next();
    let rest = matches.count();
    if rest > 0 {
        return Err(WorkflowError::AmbiguousName {
            resource: "repository",
            name: name.to_string(),
            count: rest + 1,
        });
    }
    Ok(first.map(|r| r.id.clone()))
}

/// Turn a wait outcome into workflow control flow.
pub fn require_ready(
    outcome: WaitOutcome,
    resource: &'static str,
    id: &str,
    expected: &'static str,
) -> Result<(), WorkflowError> {
    match outcome {
        WaitOutcome::Ready => Ok(()),
        WaitOutcome::Failed(detail) => Err(WorkflowError::ResourceFailed {
            resource,
            id: id.to_string(),
            expected,
            detail,
        }),
        WaitOutcome::TimedOut => Err(WorkflowError::WaitTimeout {
            resource,
            id: id.to_string(),
            expected,
            timeout: STATUS_WAIT_TIMEOUT,
        }),
    }
}
