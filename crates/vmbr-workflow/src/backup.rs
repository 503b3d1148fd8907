//! Backup workflow: snapshot a VM, export the image, optionally relay it.
//!
//! LocateVM -> LocateOrCreateRepository -> [PruneIfExisting] ->
//! SubmitSnapshot -> WaitTagAvailable -> ExportToObjectStore ->
//! [WaitSourceObjectVisible -> Transfer]. Every arrow is a hard
//! dependency; the first failure aborts the run and nothing is rolled
//! back.

use tokio_util::sync::CancellationToken;
use tracing::info;

use vmbr_cloud::{
    prune_repository_tags, wait_for_tag_available, ComputeApi, ImageApi, SnapshotOutcome,
    SnapshotToExistingRepository, SnapshotToNewRepository,
};
use vmbr_core::{artifact_path, format_timestamp, ServerId};
use vmbr_transfer::{transfer, wait_until_object_exists, TransferBackend};

use crate::common::{
    check_cancelled, match_repository, require_ready, OBJECT_POLL_INTERVAL, OBJECT_WAIT_TIMEOUT,
    STATUS_POLL_INTERVAL, STATUS_WAIT_TIMEOUT,
};
use crate::error::WorkflowError;
use crate::request::{BackupRequest, OS_TYPE};

/// Run a complete backup. Returns the repository and tag the snapshot
/// landed in.
pub async fn run_backup(
    compute: &dyn ComputeApi,
    image: &dyn ImageApi,
    transfer_backend: &dyn TransferBackend,
    req: &BackupRequest,
    cancel: &CancellationToken,
) -> Result<SnapshotOutcome, WorkflowError> {
    // Locate the VM by exact name.
    check_cancelled(cancel)?;
    let server_id = locate_server(compute, &req.vm_name).await?;
    info!(server_id = %server_id, name = %req.vm_name, "found VM");

    // Existing repository or a fresh one?
    check_cancelled(cancel)?;
    let repositories = image
        .list_repositories()
        .await
        .map_err(|e| WorkflowError::cloud("list repositories", e))?;
    let existing = match_repository(&repositories, &req.repo_name)?;

    let outcome = match existing {
        None => {
            info!(repository = %req.repo_name, "repository not found, snapshotting into a new one");
            check_cancelled(cancel)?;
            image
                .snapshot_to_new_repository(
                    &server_id,
                    &SnapshotToNewRepository {
                        name: req.repo_name.clone(),
                        operating_system: OS_TYPE.to_string(),
                        version: req.date_tag.clone(),
                    },
                )
                .await
                .map_err(|e| WorkflowError::cloud("create snapshot into new repository", e))?
        }
        Some(repo_id) => {
            info!(repository = %repo_id, "repository found, snapshotting into it");
            // Reserve one slot for the tag this snapshot is about to add.
            if req.tag_num > 0 {
                check_cancelled(cancel)?;
                prune_repository_tags(image, &repo_id, req.tag_num - 1)
                    .await
                    .map_err(|e| WorkflowError::cloud("prune repository tags", e))?;
            }
            check_cancelled(cancel)?;
            image
                .snapshot_to_existing_repository(
                    &server_id,
                    &SnapshotToExistingRepository {
                        repository_id: repo_id,
                        version: req.date_tag.clone(),
                    },
                )
                .await
                .map_err(|e| WorkflowError::cloud("create snapshot into existing repository", e))?
        }
    };
    info!(
        repository_id = %outcome.repository_id,
        tag_id = %outcome.tag_id,
        "snapshot created"
    );

    // The tag must be available before it can be exported.
    check_cancelled(cancel)?;
    let wait = wait_for_tag_available(
        image,
        &outcome.tag_id,
        STATUS_POLL_INTERVAL,
        STATUS_WAIT_TIMEOUT,
        cancel,
    )
    .await
    .map_err(|e| WorkflowError::cloud("wait for tag available", e))?;
    require_ready(wait, "tag", outcome.tag_id.as_str(), "available")?;
    info!(tag_id = %outcome.tag_id, "tag is available");

    // Export the snapshot to the object store.
    check_cancelled(cancel)?;
    let filepath = artifact_path(&req.bucket, &req.image_template, &req.now);
    image
        .export_tag(&outcome.tag_id, &filepath)
        .await
        .map_err(|e| WorkflowError::cloud("export tag to object store", e))?;
    info!(tag_id = %outcome.tag_id, filepath = %filepath, "exported snapshot");

    // Optional relay to the final destination store.
    if let Some(spec) = &req.transfer {
        let object_name = format_timestamp(&req.image_template, &req.now);

        check_cancelled(cancel)?;
        wait_until_object_exists(
            transfer_backend,
            &spec.src,
            &object_name,
            OBJECT_POLL_INTERVAL,
            OBJECT_WAIT_TIMEOUT,
            cancel,
        )
        .await
        .map_err(|e| WorkflowError::transfer("wait for exported object", e))?;

        check_cancelled(cancel)?;
        let duration = transfer(transfer_backend, &spec.src, &spec.dst, &object_name, cancel)
            .await
            .map_err(|e| WorkflowError::transfer("relay exported object", e))?;
        info!(
            object = %object_name,
            duration_secs = duration,
            "relayed exported object to destination store"
        );
    }

    Ok(outcome)
}

/// Exact-name server lookup: zero matches is fatal, more than one match
/// is ambiguous and fatal as well.
async fn locate_server(compute: &dyn ComputeApi, name: &str) -> Result<ServerId, WorkflowError> {
    let servers = compute
        .list_servers(name)
        .await
        .map_err(|e| WorkflowError::cloud("list servers", e))?;
    let mut matches = servers.iter().filter(|s| s.name == name);
    let first = matches.next();
    let rest = matches.count();
    if rest > 0 {
        return Err(WorkflowError::AmbiguousName {
            resource: "server",
            name: name.to_string(),
            count: rest + 1,
        });
    }
    match first {
        Some(server) => Ok(server.id.clone()),
        None => Err(WorkflowError::ServerNotFound(name.to_string())),
    }
}
