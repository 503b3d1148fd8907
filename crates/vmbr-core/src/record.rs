//! Resource records read from the remote services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RepositoryId, ServerId, TagId};
use crate::status::{ServerStatus, TagStatus};

/// A virtual machine as listed by the compute service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: ServerId,
    pub name: String,
    #[serde(default)]
    pub status: ServerStatus,
}

/// A named collection of tags holding the history of one logical VM image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
}

/// One timestamped version of a disk image within a repository.
///
/// Owned by the image service; this side only reads tags and requests
/// their deletion during retention pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: TagId,
    pub repository_id: RepositoryId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: TagStatus,
}

/// Credentials and addressing for one object-store endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

impl StoreLocation {
    /// A location can be handed to the transfer backend only when every
    /// field is present.
    pub fn is_fully_specified(&self) -> bool {
        !self.endpoint.is_empty()
            && !self.access_key.is_empty()
            && !self.secret_key.is_empty()
            && !self.bucket.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_location_fully_specified() {
        let loc = StoreLocation {
            endpoint: "https://s3.example".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: "images".into(),
        };
        assert!(loc.is_fully_specified());

        let partial = StoreLocation {
            secret_key: String::new(),
            ..loc
        };
        assert!(!partial.is_fully_specified());
    }
}
