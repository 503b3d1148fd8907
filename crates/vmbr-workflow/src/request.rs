//! Inputs to the backup and restore workflows.
//!
//! These are built once per invocation by the configuration loader and
//! stay immutable for the life of the run.

use chrono::{DateTime, FixedOffset};

use vmbr_core::StoreLocation;

/// Operating system label attached to created repositories.
pub const OS_TYPE: &str = "linux";

/// Source and destination stores for the optional cross-store relay.
#[derive(Debug, Clone)]
pub struct TransferSpec {
    pub src: StoreLocation,
    pub dst: StoreLocation,
}

/// Everything a backup run needs.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Exact name of the VM to snapshot.
    pub vm_name: String,
    /// Logical repository that collects this VM's history.
    pub repo_name: String,
    /// Object-store bucket the image service exports into.
    pub bucket: String,
    /// Artifact name template, may contain timestamp tokens.
    pub image_template: String,
    /// Formatted timestamp tag used as the version label.
    pub date_tag: String,
    /// Retention limit for the repository; 0 disables pruning.
    pub tag_num: usize,
    /// Reference timestamp for this run.
    pub now: DateTime<FixedOffset>,
    /// Relay the exported artifact when set.
    pub transfer: Option<TransferSpec>,
}

/// Everything a restore run needs.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Logical repository to restore from (or create).
    pub repo_name: String,
    /// Object-store bucket the image service uploads from.
    pub bucket: String,
    /// Artifact name template, may contain timestamp tokens.
    pub image_template: String,
    /// Prefix of the created VM's name; the timestamp tag is appended.
    pub vm_name_prefix: String,
    /// Opaque provisioning identifiers, passed through unchanged.
    pub flavor_id: String,
    pub network_id: String,
    pub keypair_id: String,
    pub security_group_id: String,
    /// Formatted timestamp tag used as the version label.
    pub date_tag: String,
    /// Retention limit for the repository; 0 disables pruning.
    pub tag_num: usize,
    /// Reference timestamp for this run.
    pub now: DateTime<FixedOffset>,
    /// Relay the artifact in from another store when set.
    pub transfer: Option<TransferSpec>,
}
