//! Restore workflow: relay the image in, upload it as a tag, boot a VM.
//!
//! Mirror of the backup flow: [Transfer -> WaitObjectVisible] ->
//! LocateOrCreateRepository -> [PruneIfExisting] -> UploadImage ->
//! WaitTagActive -> CreateServer -> WaitServerActive. The relay runs
//! strictly before the visibility wait so the object lands at the
//! well-known path before the upload is requested.

use tokio_util::sync::CancellationToken;
use tracing::info;

use vmbr_cloud::{
    prune_repository_tags, wait_for_server_active, wait_for_tag_active, ComputeApi,
    CreateServerRequest, ImageApi, ServerNic, UploadToExistingRepository, UploadToNewRepository,
};
use vmbr_core::{artifact_path, format_timestamp, ServerId};
use vmbr_transfer::{transfer, wait_until_object_exists, TransferBackend};

use crate::common::{
    check_cancelled, match_repository, require_ready, OBJECT_POLL_INTERVAL, OBJECT_WAIT_TIMEOUT,
    STATUS_POLL_INTERVAL, STATUS_WAIT_TIMEOUT,
};
use crate::error::WorkflowError;
use crate::request::{RestoreRequest, OS_TYPE};

const IMAGE_TYPE: &str = "common";
const DISK_FORMAT: &str = "raw";
const CONTAINER_FORMAT: &str = "bare";

/// Run a complete restore. Returns the id of the created server.
pub async fn run_restore(
    compute: &dyn ComputeApi,
    image: &dyn ImageApi,
    transfer_backend: &dyn TransferBackend,
    req: &RestoreRequest,
    cancel: &CancellationToken,
) -> Result<ServerId, WorkflowError> {
    // Optional relay from the remote store into the one the image
    // service reads from.
    if let Some(spec) = &req.transfer {
        let object_name = format_timestamp(&req.image_template, &req.now);

        check_cancelled(cancel)?;
        let duration = transfer(transfer_backend, &spec.src, &spec.dst, &object_name, cancel)
            .await
            .map_err(|e| WorkflowError::transfer("relay image from source store", e))?;
        info!(
            object = %object_name,
            duration_secs = duration,
            "relayed image to upload store"
        );

        check_cancelled(cancel)?;
        wait_until_object_exists(
            transfer_backend,
            &spec.dst,
            &object_name,
            OBJECT_POLL_INTERVAL,
            OBJECT_WAIT_TIMEOUT,
            cancel,
        )
        .await
        .map_err(|e| WorkflowError::transfer("wait for relayed image", e))?;
    }

    // Existing repository or a fresh one?
    check_cancelled(cancel)?;
    let repositories = image
        .list_repositories()
        .await
        .map_err(|e| WorkflowError::cloud("list repositories", e))?;
    let existing = match_repository(&repositories, &req.repo_name)?;

    let filepath = artifact_path(&req.bucket, &req.image_template, &req.now);
    let outcome = match existing {
        None => {
            info!(repository = %req.repo_name, "repository not found, uploading into a new one");
            check_cancelled(cancel)?;
            image
                .upload_to_new_repository(&UploadToNewRepository {
                    name: req.repo_name.clone(),
                    operating_system: OS_TYPE.to_string(),
                    description: "restore upload".to_string(),
                    version: req.date_tag.clone(),
                    image_type: IMAGE_TYPE.to_string(),
                    disk_format: DISK_FORMAT.to_string(),
                    container_format: CONTAINER_FORMAT.to_string(),
                    filepath: filepath.clone(),
                })
                .await
                .map_err(|e| WorkflowError::cloud("upload image to new repository", e))?
        }
        Some(repo_id) => {
            info!(repository = %repo_id, version = %req.date_tag, "repository found, uploading new tag");
            // Reserve one slot for the tag this upload is about to add.
            if req.tag_num > 0 {
                check_cancelled(cancel)?;
                prune_repository_tags(image, &repo_id, req.tag_num - 1)
                    .await
                    .map_err(|e| WorkflowError::cloud("prune repository tags", e))?;
            }
            check_cancelled(cancel)?;
            image
                .upload_to_existing_repository(&UploadToExistingRepository {
                    repository_id: repo_id,
                    version: req.date_tag.clone(),
                    image_type: IMAGE_TYPE.to_string(),
                    disk_format: DISK_FORMAT.to_string(),
                    container_format: CONTAINER_FORMAT.to_string(),
                    filepath: filepath.clone(),
                })
                .await
                .map_err(|e| WorkflowError::cloud("upload image to existing repository", e))?
        }
    };
    info!(
        repository_id = %outcome.repository_id,
        tag_id = %outcome.tag_id,
        "image uploaded"
    );

    // The tag must be active before a server can boot from it.
    check_cancelled(cancel)?;
    let wait = wait_for_tag_active(
        image,
        &outcome.tag_id,
        STATUS_POLL_INTERVAL,
        STATUS_WAIT_TIMEOUT,
        cancel,
    )
    .await
    .map_err(|e| WorkflowError::cloud("wait for tag active", e))?;
    require_ready(wait, "tag", outcome.tag_id.as_str(), "active")?;
    info!(tag_id = %outcome.tag_id, "tag is active");

    // Boot a VM from the tag.
    let vm_name = format!("{}-{}", req.vm_name_prefix, req.date_tag);
    check_cancelled(cancel)?;
    let server = compute
        .create_server(&CreateServerRequest {
            name: vm_name.clone(),
            image_id: outcome.tag_id.clone(),
            flavor_id: req.flavor_id.clone(),
            keypair_id: req.keypair_id.clone(),
            nics: vec![ServerNic {
                network_id: req.network_id.clone(),
                security_group_ids: vec![req.security_group_id.clone()],
            }],
        })
        .await
        .map_err(|e| WorkflowError::cloud("create server", e))?;
    info!(server_id = %server.id, name = %vm_name, "server created");

    check_cancelled(cancel)?;
    let wait = wait_for_server_active(
        compute,
        &server.id,
        STATUS_POLL_INTERVAL,
        STATUS_WAIT_TIMEOUT,
        cancel,
    )
    .await
    .map_err(|e| WorkflowError::cloud("wait for server active", e))?;
    require_ready(wait, "server", server.id.as_str(), "active")?;
    info!(server_id = %server.id, name = %vm_name, "VM restored successfully");

    Ok(server.id)
}
