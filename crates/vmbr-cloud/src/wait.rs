//! Polling-based availability waiter.
//!
//! Bridges synchronous workflow code to asynchronously-transitioning
//! remote resources: a tag becoming available after a snapshot, a tag
//! becoming active after an upload, a server becoming active after
//! creation. One state machine, different readiness predicates.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vmbr_core::{ServerId, ServerStatus, TagId, TagStatus};

use crate::api::{ComputeApi, ImageApi};
use crate::error::CloudError;

/// What one status poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Still transitioning.
    Pending,
    /// Reached the expected terminal success state.
    Ready,
    /// Reached a terminal failure state.
    Failed(String),
}

/// Terminal result of a wait. There are no other outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The resource reached its expected state.
    Ready,
    /// The remote system reported the resource failed.
    Failed(String),
    /// The deadline passed while the resource was still pending.
    TimedOut,
}

/// One pollable view of a remote resource's status.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn poll(&self) -> Result<ResourceState, CloudError>;
}

/// Poll `probe` every `poll_interval` until it reports a terminal state or
/// `timeout` elapses.
///
/// A probe transport error does not terminate the wait: it is logged and
/// the loop keeps polling up to the deadline. Cancellation is observed
/// between iterations and returns `CloudError::Cancelled`.
pub async fn wait_until_ready(
    probe: &dyn StatusProbe,
    resource: &str,
    id: &str,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<WaitOutcome, CloudError> {
    let started = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }

        match probe.poll().await {
            Ok(ResourceState::Ready) => return Ok(WaitOutcome::Ready),
            Ok(ResourceState::Failed(detail)) => return Ok(WaitOutcome::Failed(detail)),
            Ok(ResourceState::Pending) => {
                debug!(resource, id, "still pending");
            }
            // Transient: an RPC hiccup must not end the wait.
            Err(e) => {
                warn!(resource, id, error = %e, "status poll failed; retrying");
            }
        }

        if started.elapsed() >= timeout {
            return Ok(WaitOutcome::TimedOut);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

struct TagProbe<'a> {
    api: &'a dyn ImageApi,
    id: &'a TagId,
    ready_when: TagStatus,
}

#[async_trait]
impl StatusProbe for TagProbe<'_> {
    async fn poll(&self) -> Result<ResourceState, CloudError> {
        let tag = self.api.get_tag(self.id).await?;
        Ok(if tag.status == self.ready_when {
            ResourceState::Ready
        } else if tag.status.is_failed() {
            ResourceState::Failed(format!("tag entered status {:?}", tag.status))
        } else {
            ResourceState::Pending
        })
    }
}

struct ServerProbe<'a> {
    api: &'a dyn ComputeApi,
    id: &'a ServerId,
}

#[async_trait]
impl StatusProbe for ServerProbe<'_> {
    async fn poll(&self) -> Result<ResourceState, CloudError> {
        let server = self.api.get_server(self.id).await?;
        Ok(if server.status == ServerStatus::Active {
            ResourceState::Ready
        } else if server.status.is_failed() {
            ResourceState::Failed(format!("server entered status {:?}", server.status))
        } else {
            ResourceState::Pending
        })
    }
}

/// Wait for a snapshotted tag to become exportable.
pub async fn wait_for_tag_available(
    api: &dyn ImageApi,
    id: &TagId,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<WaitOutcome, CloudError> {
    let probe = TagProbe {
        api,
        id,
        ready_when: TagStatus::Available,
    };
    wait_until_ready(&probe, "tag", id.as_str(), poll_interval, timeout, cancel).await
}

/// Wait for an uploaded tag to become bootable.
pub async fn wait_for_tag_active(
    api: &dyn ImageApi,
    id: &TagId,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<WaitOutcome, CloudError> {
    let probe = TagProbe {
        api,
        id,
        ready_when: TagStatus::Active,
    };
    wait_until_ready(&probe, "tag", id.as_str(), poll_interval, timeout, cancel).await
}

/// Wait for a created server to come up.
pub async fn wait_for_server_active(
    api: &dyn ComputeApi,
    id: &ServerId,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<WaitOutcome, CloudError> {
    let probe = ServerProbe { api, id };
    wait_until_ready(&probe, "server", id.as_str(), poll_interval, timeout, cancel).await
}
