//! In-memory fakes of the capability traits for workflow tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use vmbr_cloud::{
    CloudError, ComputeApi, CreateServerRequest, ImageApi, SnapshotOutcome,
    SnapshotToExistingRepository, SnapshotToNewRepository, UploadToExistingRepository,
    UploadToNewRepository,
};
use vmbr_core::{
    Repository, RepositoryId, ServerId, ServerRecord, ServerStatus, StoreLocation, TagId,
    TagRecord, TagStatus,
};
use vmbr_transfer::{JobId, JobStatus, ObjectStat, TransferBackend, TransferError, TransferStats};

/// Reference timestamp used across workflow tests: 2025-11-23 10:18 +08:00.
pub fn request_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 11, 23, 10, 18, 0)
        .unwrap()
}

/// Cloud fake implementing both capability traits over in-memory state.
///
/// Created tags come up in their expected ready state (available after a
/// snapshot, active after an upload) unless `stuck_in` pins them.
pub struct FakeCloud {
    pub servers: Mutex<Vec<ServerRecord>>,
    pub repositories: Mutex<Vec<Repository>>,
    pub tags: Mutex<Vec<TagRecord>>,
    pub deleted_tags: Mutex<Vec<TagId>>,
    pub exports: Mutex<Vec<(TagId, String)>>,
    /// Version labels of submitted snapshots, in order.
    pub snapshot_versions: Mutex<Vec<String>>,
    /// (version, filepath) of submitted uploads, in order.
    pub uploads: Mutex<Vec<(String, String)>>,
    pub created_servers: Mutex<Vec<CreateServerRequest>>,
    stuck: Option<TagStatus>,
    tag_seq: AtomicU32,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            servers: Mutex::new(Vec::new()),
            repositories: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            deleted_tags: Mutex::new(Vec::new()),
            exports: Mutex::new(Vec::new()),
            snapshot_versions: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            created_servers: Mutex::new(Vec::new()),
            stuck: None,
            tag_seq: AtomicU32::new(0),
        }
    }

    pub fn with_server(self, id: &str, name: &str) -> Self {
        self.servers.lock().unwrap().push(ServerRecord {
            id: ServerId::new(id),
            name: name.to_string(),
            status: ServerStatus::Active,
        });
        self
    }

    pub fn with_repository(self, id: &str, name: &str) -> Self {
        self.repositories.lock().unwrap().push(Repository {
            id: RepositoryId::new(id),
            name: name.to_string(),
        });
        self
    }

    pub fn with_tag(self, id: &str, repo: &str, minute: u32) -> Self {
        self.tags.lock().unwrap().push(TagRecord {
            id: TagId::new(id),
            repository_id: RepositoryId::new(repo),
            created_at: Utc.with_ymd_and_hms(2025, 11, 23, 9, minute, 0).unwrap(),
            status: TagStatus::Available,
        });
        self
    }

    /// Pin every tag created from now on to `status`, never transitioning.
    pub fn stuck_in(mut self, status: TagStatus) -> Self {
        self.stuck = Some(status);
        self
    }

    fn create_tag(&self, repo: RepositoryId, ready_status: TagStatus) -> TagRecord {
        let n = self.tag_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let tag = TagRecord {
            id: TagId::new(format!("tag-new-{n}")),
            repository_id: repo,
            created_at: Utc.with_ymd_and_hms(2025, 11, 23, 10, 18, 0).unwrap(),
            status: self.stuck.unwrap_or(ready_status),
        };
        self.tags.lock().unwrap().push(tag.clone());
        tag
    }

    fn create_repository(&self, name: &str) -> RepositoryId {
        let id = RepositoryId::new("repo-new");
        self.repositories.lock().unwrap().push(Repository {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn list_servers(&self, name: &str) -> Result<Vec<ServerRecord>, CloudError> {
        Ok(self
            .servers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect())
    }

    async fn create_server(&self, req: &CreateServerRequest) -> Result<ServerRecord, CloudError> {
        self.created_servers.lock().unwrap().push(req.clone());
        let server = ServerRecord {
            id: ServerId::new("srv-new"),
            name: req.name.clone(),
            status: ServerStatus::Active,
        };
        self.servers.lock().unwrap().push(server.clone());
        Ok(server)
    }

    async fn get_server(&self, id: &ServerId) -> Result<ServerRecord, CloudError> {
        self.servers
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("server {id}")))
    }
}

#[async_trait]
impl ImageApi for FakeCloud {
    async fn list_repositories(&self) -> Result<Vec<Repository>, CloudError> {
        Ok(self.repositories.lock().unwrap().clone())
    }

    async fn snapshot_to_new_repository(
        &self,
        _server: &ServerId,
        req: &SnapshotToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        self.snapshot_versions
            .lock()
            .unwrap()
            .push(req.version.clone());
        let repo = self.create_repository(&req.name);
        let tag = self.create_tag(repo.clone(), TagStatus::Available);
        Ok(SnapshotOutcome {
            repository_id: repo,
            tag_id: tag.id,
        })
    }

    async fn snapshot_to_existing_repository(
        &self,
        _server: &ServerId,
        req: &SnapshotToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        self.snapshot_versions
            .lock()
            .unwrap()
            .push(req.version.clone());
        let tag = self.create_tag(req.repository_id.clone(), TagStatus::Available);
        Ok(SnapshotOutcome {
            repository_id: req.repository_id.clone(),
            tag_id: tag.id,
        })
    }

    async fn upload_to_new_repository(
        &self,
        req: &UploadToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        self.uploads
            .lock()
            .unwrap()
            .push((req.version.clone(), req.filepath.clone()));
        let repo = self.create_repository(&req.name);
        let tag = self.create_tag(repo.clone(), TagStatus::Active);
        Ok(SnapshotOutcome {
            repository_id: repo,
            tag_id: tag.id,
        })
    }

    async fn upload_to_existing_repository(
        &self,
        req: &UploadToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        self.uploads
            .lock()
            .unwrap()
            .push((req.version.clone(), req.filepath.clone()));
        let tag = self.create_tag(req.repository_id.clone(), TagStatus::Active);
        Ok(SnapshotOutcome {
            repository_id: req.repository_id.clone(),
            tag_id: tag.id,
        })
    }

    async fn list_tags(&self, repo: &RepositoryId) -> Result<Vec<TagRecord>, CloudError> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.repository_id == repo)
            .cloned()
            .collect())
    }

    async fn get_tag(&self, id: &TagId) -> Result<TagRecord, CloudError> {
        self.tags
            .lock()
            .unwrap()
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("tag {id}")))
    }

    async fn delete_tag(&self, id: &TagId) -> Result<(), CloudError> {
        self.tags.lock().unwrap().retain(|t| &t.id != id);
        self.deleted_tags.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn export_tag(&self, id: &TagId, filepath: &str) -> Result<(), CloudError> {
        self.exports
            .lock()
            .unwrap()
            .push((id.clone(), filepath.to_string()));
        Ok(())
    }
}

/// Transfer fake: every object exists, every copy finishes on first poll.
#[derive(Default)]
pub struct FakeTransfer {
    pub copies: AtomicU32,
    pub copied_keys: Mutex<Vec<String>>,
}

impl FakeTransfer {
    pub fn location(bucket: &str) -> StoreLocation {
        StoreLocation {
            endpoint: "https://s3.example".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl TransferBackend for FakeTransfer {
    async fn stat_object(
        &self,
        _location: &StoreLocation,
        _key: &str,
    ) -> Result<Option<ObjectStat>, TransferError> {
        Ok(Some(ObjectStat { size: 1024 }))
    }

    async fn copy_object(
        &self,
        _src: &StoreLocation,
        _dst: &StoreLocation,
        key: &str,
    ) -> Result<JobId, TransferError> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        self.copied_keys.lock().unwrap().push(key.to_string());
        Ok(JobId(1))
    }

    async fn job_status(&self, _id: JobId) -> Result<JobStatus, TransferError> {
        Ok(JobStatus {
            finished: true,
            success: true,
            error: String::new(),
            duration: 1.0,
        })
    }

    async fn stats(&self) -> Result<TransferStats, TransferError> {
        Ok(TransferStats::default())
    }
}
