//! VMBR Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! All types here represent the core business domain of VMBR: servers,
//! image repositories, tags, object-store locations, and the artifact
//! naming rules shared by the backup and restore workflows.

pub mod ids;
pub mod record;
pub mod retention;
pub mod status;
pub mod strftime;

// Re-export commonly used types
pub use ids::{RepositoryId, ServerId, TagId};
pub use record::{Repository, ServerRecord, StoreLocation, TagRecord};
pub use retention::excess_tags;
pub use status::{ServerStatus, TagStatus};
pub use strftime::{artifact_path, format_timestamp};
