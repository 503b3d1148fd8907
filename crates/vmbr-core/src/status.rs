//! Status enums for remote resources.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tag reported by the image service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    /// Snapshot or upload still in progress.
    #[default]
    Creating,
    /// Snapshot completed; tag can be exported.
    Available,
    /// Uploaded image registered; tag can boot a server.
    Active,
    /// The service reported a terminal failure.
    Error,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl TagStatus {
    /// Returns true if the tag reached a terminal failure state.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Lifecycle status of a server reported by the compute service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Server is being provisioned.
    #[default]
    Building,
    /// Server is up.
    Active,
    /// Provisioning failed.
    Error,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    /// Returns true if the server reached a terminal failure state.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_deserializes() {
        let s: TagStatus = serde_json::from_str("\"half-baked\"").unwrap();
        assert_eq!(s, TagStatus::Unknown);
    }

    #[test]
    fn test_known_status_deserializes() {
        let s: ServerStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(s, ServerStatus::Active);
    }
}
