//! reqwest-based implementation of the capability traits.
//!
//! Speaks the project-scoped REST API: every path is rooted under the
//! project code and every request carries the bearer token.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vmbr_core::{Repository, RepositoryId, ServerId, ServerRecord, TagId, TagRecord};

use crate::api::{
    ComputeApi, CreateServerRequest, ImageApi, SnapshotOutcome, SnapshotToExistingRepository,
    SnapshotToNewRepository, UploadToExistingRepository, UploadToNewRepository,
};
use crate::error::CloudError;

/// HTTP client for the compute/image service.
pub struct HttpCloudClient {
    inner: reqwest::Client,
    base_url: String,
    token: String,
    project: String,
}

#[derive(Deserialize)]
struct ServerList {
    servers: Vec<ServerRecord>,
}

#[derive(Deserialize)]
struct RepositoryList {
    repositories: Vec<Repository>,
}

#[derive(Deserialize)]
struct TagList {
    tags: Vec<TagRecord>,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    repository: Option<Repository>,
    tag: Option<TagRecord>,
}

#[derive(Serialize)]
struct ExportRequest<'a> {
    filepath: &'a str,
}

impl HttpCloudClient {
    /// Create a client for one project scope.
    pub fn new(base_url: &str, token: &str, project: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            project: project.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/projects/{}{}", self.base_url, self.project, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CloudError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");
        let response = self
            .inner
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let url = self.url(path);
        debug!(url = %url, "POST request");
        let response = self
            .inner
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<(), CloudError> {
        let url = self.url(path);
        debug!(url = %url, "POST request");
        let response = self
            .inner
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(message));
        }
        Err(CloudError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn outcome(response: SnapshotResponse) -> Result<SnapshotOutcome, CloudError> {
        let repository = response
            .repository
            .ok_or_else(|| CloudError::Malformed("response missing repository info".into()))?;
        let tag = response
            .tag
            .ok_or_else(|| CloudError::Malformed("response missing tag info".into()))?;
        Ok(SnapshotOutcome {
            repository_id: repository.id,
            tag_id: tag.id,
        })
    }
}

#[async_trait]
impl ComputeApi for HttpCloudClient {
    async fn list_servers(&self, name: &str) -> Result<Vec<ServerRecord>, CloudError> {
        let list: ServerList = self
            .get_json(&format!("/servers?name={}", urlencode(name)))
            .await?;
        Ok(list.servers)
    }

    async fn create_server(&self, req: &CreateServerRequest) -> Result<ServerRecord, CloudError> {
        self.post_json("/servers", req).await
    }

    async fn get_server(&self, id: &ServerId) -> Result<ServerRecord, CloudError> {
        self.get_json(&format!("/servers/{}", id)).await
    }
}

#[async_trait]
impl ImageApi for HttpCloudClient {
    async fn list_repositories(&self) -> Result<Vec<Repository>, CloudError> {
        let list: RepositoryList = self.get_json("/repositories").await?;
        Ok(list.repositories)
    }

    async fn snapshot_to_new_repository(
        &self,
        server: &ServerId,
        req: &SnapshotToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        let response: SnapshotResponse = self
            .post_json(&format!("/servers/{}/snapshot", server), req)
            .await?;
        Self::outcome(response)
    }

    async fn snapshot_to_existing_repository(
        &self,
        server: &ServerId,
        req: &SnapshotToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        let response: SnapshotResponse = self
            .post_json(&format!("/servers/{}/snapshot", server), req)
            .await?;
        Self::outcome(response)
    }

    async fn upload_to_new_repository(
        &self,
        req: &UploadToNewRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        let response: SnapshotResponse = self.post_json("/repositories/images", req).await?;
        Self::outcome(response)
    }

    async fn upload_to_existing_repository(
        &self,
        req: &UploadToExistingRepository,
    ) -> Result<SnapshotOutcome, CloudError> {
        let response: SnapshotResponse = self.post_json("/repositories/images", req).await?;
        Self::outcome(response)
    }

    async fn list_tags(&self, repo: &RepositoryId) -> Result<Vec<TagRecord>, CloudError> {
        // limit=-1 asks for the unbounded listing.
        let list: TagList = self
            .get_json(&format!("/repositories/{}/tags?limit=-1", repo))
            .await?;
        Ok(list.tags)
    }

    async fn get_tag(&self, id: &TagId) -> Result<TagRecord, CloudError> {
        self.get_json(&format!("/tags/{}", id)).await
    }

    async fn delete_tag(&self, id: &TagId) -> Result<(), CloudError> {
        let url = self.url(&format!("/tags/{}", id));
        debug!(url = %url, "DELETE request");
        let response = self
            .inner
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn export_tag(&self, id: &TagId, filepath: &str) -> Result<(), CloudError> {
        self.post_empty(
            &format!("/tags/{}/download", id),
            &ExportRequest { filepath },
        )
        .await
    }
}

/// Percent-encode a query value. Only the characters that matter for the
/// name filter are escaped.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
