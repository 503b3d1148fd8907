//! Capability traits and request records for the compute/image service.
//!
//! The traits are deliberately narrow: they expose exactly the operations
//! the backup and restore workflows need, nothing else from the remote
//! API surface.

use async_trait::async_trait;
use serde::Serialize;

use vmbr_core::{Repository, RepositoryId, ServerId, ServerRecord, TagId, TagRecord};

use crate::error::CloudError;

/// Snapshot a server into a repository that does not exist yet.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotToNewRepository {
    pub name: String,
    pub operating_system: String,
    pub version: String,
}

/// Snapshot a server into an existing repository as a new tag.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotToExistingRepository {
    pub repository_id: RepositoryId,
    pub version: String,
}

/// Upload an object-store image into a repository that does not exist yet.
#[derive(Debug, Clone, Serialize)]
pub struct UploadToNewRepository {
    pub name: String,
    pub operating_system: String,
    pub description: String,
    pub version: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub disk_format: String,
    pub container_format: String,
    pub filepath: String,
}

/// Upload an object-store image into an existing repository as a new tag.
#[derive(Debug, Clone, Serialize)]
pub struct UploadToExistingRepository {
    pub repository_id: RepositoryId,
    pub version: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub disk_format: String,
    pub container_format: String,
    pub filepath: String,
}

/// What a successful snapshot or upload hands back: the repository the tag
/// landed in and the tag itself.
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub repository_id: RepositoryId,
    pub tag_id: TagId,
}

/// One network interface for a server about to be created.
#[derive(Debug, Clone, Serialize)]
pub struct ServerNic {
    pub network_id: String,
    pub security_group_ids: Vec<String>,
}

/// Create a server from an image tag.
#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub image_id: TagId,
    pub flavor_id: String,
    pub keypair_id: String,
    pub nics: Vec<ServerNic>,
}

/// Compute-side operations: server lookup and creation.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// List servers whose name matches `name` exactly.
    async fn list_servers(&self, name: &str) -> Result<Vec<ServerRecord>, CloudError>;

    /// Create a server and return its initial record.
    async fn create_server(&self, req: &CreateServerRequest) -> Result<ServerRecord, CloudError>;

    /// Fetch the current record of one server.
    async fn get_server(&self, id: &ServerId) -> Result<ServerRecord, CloudError>;
}

/// Image-side operations: repositories, tags, snapshot/upload/export.
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// List every repository in the project.
    async fn list_repositories(&self) -> Result<Vec<Repository>, CloudError>;

    /// Snapshot `server` into a freshly created repository.
    async fn snapshot_to_new_repository(
        &self,
        server: &ServerId,
        req: &SnapshotToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError>;

    /// Snapshot `server` into an existing repository.
    async fn snapshot_to_existing_repository(
        &self,
        server: &ServerId,
        req: &SnapshotToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError>;

    /// Register an uploaded image in a freshly created repository.
    async fn upload_to_new_repository(
        &self,
        req: &UploadToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError>;

    /// Register an uploaded image in an existing repository.
    async fn upload_to_existing_repository(
        &self,
        req: &UploadToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError>;

    /// List every tag of `repo` (unbounded).
    async fn list_tags(&self, repo: &RepositoryId) -> Result<Vec<TagRecord>, CloudError>;

    /// Fetch the current record of one tag.
    async fn get_tag(&self, id: &TagId) -> Result<TagRecord, CloudError>;

    /// Delete one tag.
    async fn delete_tag(&self, id: &TagId) -> Result<(), CloudError>;

    /// Export a tag's disk image to an object-store path
    /// (`dss-public://bucket/name`).
    async fn export_tag(&self, id: &TagId, filepath: &str) -> Result<(), CloudError>;
}
