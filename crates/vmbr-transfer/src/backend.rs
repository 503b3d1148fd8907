//! The capability surface the transfer coordinator polls against.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use vmbr_core::StoreLocation;

use crate::error::TransferError;

/// Identifier of an asynchronous copy job on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a stat call reports about a present object.
#[derive(Debug, Clone, Copy)]
pub struct ObjectStat {
    /// Object size in bytes; -1 when the backend could not determine it.
    pub size: i64,
}

/// Status snapshot of a copy job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: String,
    /// Elapsed seconds reported by the backend.
    #[serde(default)]
    pub duration: f64,
}

/// Coarse byte-throughput counters of the backend.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransferStats {
    #[serde(default)]
    pub bytes: i64,
    /// Bytes per second.
    #[serde(default)]
    pub speed: f64,
}

/// Asynchronous object-copy backend.
///
/// `stat_object` returns `Ok(None)` when the backend reports the object
/// absent, including RPC errors whose payload carries a not-found signal.
/// Every other RPC failure is an `Err`.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    async fn stat_object(
        &self,
        location: &StoreLocation,
        key: &str,
    ) -> Result<Option<ObjectStat>, TransferError>;

    /// Submit an asynchronous copy of `key` from `src` to `dst` and return
    /// the job identifier.
    async fn copy_object(
        &self,
        src: &StoreLocation,
        dst: &StoreLocation,
        key: &str,
    ) -> Result<JobId, TransferError>;

    async fn job_status(&self, id: JobId) -> Result<JobStatus, TransferError>;

    /// Sample the global throughput counters.
    async fn stats(&self) -> Result<TransferStats, TransferError>;
}
