//! Client layer for the remote compute/image service.
//!
//! The workflows in `vmbr-workflow` talk to the service exclusively
//! through the [`ComputeApi`] and [`ImageApi`] capability traits so they
//! can be exercised against in-memory fakes. [`HttpCloudClient`] is the
//! production implementation. This crate also owns the generic
//! availability waiter and the retention pruner driver.

pub mod api;
pub mod error;
pub mod http;
pub mod retention;
pub mod wait;

pub use api::{
    ComputeApi, CreateServerRequest, ImageApi, ServerNic, SnapshotOutcome,
    SnapshotToExistingRepository, SnapshotToNewRepository, UploadToExistingRepository,
    UploadToNewRepository,
};
pub use error::CloudError;
pub use http::HttpCloudClient;
pub use retention::prune_repository_tags;
pub use wait::{
    wait_for_server_active, wait_for_tag_active, wait_for_tag_available, wait_until_ready,
    ResourceState, StatusProbe, WaitOutcome,
};
