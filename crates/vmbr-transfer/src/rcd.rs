//! rclone remote-control (rcd) implementation of [`TransferBackend`].
//!
//! Talks JSON over HTTP to a running `rclone rcd` instance:
//! `operations/stat`, `operations/copyfile` (async mode), `job/status`,
//! `core/stats`. S3 endpoints are addressed with on-the-fly backend
//! strings instead of named remotes, so no rclone config file is needed.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use vmbr_core::StoreLocation;

use crate::backend::{JobId, JobStatus, ObjectStat, TransferBackend, TransferStats};
use crate::error::TransferError;

/// Client for an rclone remote-control daemon.
pub struct RcdTransferBackend {
    inner: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
}

#[derive(Deserialize)]
struct StatResponse {
    item: Option<StatItem>,
}

#[derive(Deserialize)]
struct StatItem {
    #[serde(rename = "Size")]
    size: Option<i64>,
}

#[derive(Deserialize)]
struct CopyResponse {
    jobid: JobId,
}

impl RcdTransferBackend {
    /// Create a client for the daemon at `base_url`
    /// (e.g. `http://localhost:5572`).
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    /// Use HTTP basic auth (`--rc-user`/`--rc-pass` on the daemon side).
    pub fn with_basic_auth(mut self, user: &str, pass: &str) -> Self {
        self.auth = Some((user.to_string(), pass.to_string()));
        self
    }

    async fn rpc<T: DeserializeOwned>(&self, op: &str, body: Value) -> Result<T, TransferError> {
        let url = format!("{}/{}", self.base_url, op);
        debug!(url = %url, "rclone RPC");
        let mut request = self.inner.post(&url).json(&body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransferError::Rpc {
                op: op.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

/// Build an on-the-fly rclone filesystem string for an S3 location,
/// bucket included. The endpoint is quoted to survive the ':' in its
/// scheme.
fn fs_string(location: &StoreLocation) -> String {
    format!(
        ":s3,provider=Other,endpoint='{}',access_key_id={},secret_access_key={},env_auth=false:{}",
        location.endpoint, location.access_key, location.secret_key, location.bucket
    )
}

/// Does an RPC error payload signal that the object simply is not there?
fn is_not_found(message: &str) -> bool {
    let low = message.to_lowercase();
    low.contains("not found") || low.contains("no such file") || low.contains("does not exist")
}

#[async_trait]
impl TransferBackend for RcdTransferBackend {
    async fn stat_object(
        &self,
        location: &StoreLocation,
        key: &str,
    ) -> Result<Option<ObjectStat>, TransferError> {
        let body = json!({ "fs": fs_string(location), "remote": key });
        match self.rpc::<StatResponse>("operations/stat", body).await {
            Ok(response) => Ok(response.item.map(|item| ObjectStat {
                size: item.size.unwrap_or(-1),
            })),
            // Absence is a negative answer, not a failure.
            Err(TransferError::Rpc { ref message, .. }) if is_not_found(message) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn copy_object(
        &self,
        src: &StoreLocation,
        dst: &StoreLocation,
        key: &str,
    ) -> Result<JobId, TransferError> {
        let body = json!({
            "srcFs": fs_string(src),
            "srcRemote": key,
            "dstFs": fs_string(dst),
            "dstRemote": key,
            "_async": true,
        });
        let response: CopyResponse = self.rpc("operations/copyfile", body).await?;
        Ok(response.jobid)
    }

    async fn job_status(&self, id: JobId) -> Result<JobStatus, TransferError> {
        self.rpc("job/status", json!({ "jobid": id.0 })).await
    }

    async fn stats(&self) -> Result<TransferStats, TransferError> {
        self.rpc("core/stats", json!({})).await
    }
}
