//! Transfer coordination: submit an asynchronous copy, follow it to a
//! terminal state, and hand off only once the object is observable.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vmbr_core::StoreLocation;

use crate::backend::TransferBackend;
use crate::error::TransferError;

/// Cadence of the copy-job status poll.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Copy `key` from `src` to `dst`, blocking until the backend reports a
/// terminal job state. Returns the elapsed seconds the backend measured.
///
/// Both locations must be fully specified; otherwise this fails with a
/// configuration error before submitting anything. The status poll has no
/// overall deadline (finite termination is the backend's responsibility)
/// but cancellation is observed between polls. Transient status-poll
/// errors are logged and retried.
pub async fn transfer(
    backend: &dyn TransferBackend,
    src: &StoreLocation,
    dst: &StoreLocation,
    key: &str,
    cancel: &CancellationToken,
) -> Result<f64, TransferError> {
    if !src.is_fully_specified() {
        return Err(TransferError::NotConfigured(
            "source object-store location is incomplete".into(),
        ));
    }
    if !dst.is_fully_specified() {
        return Err(TransferError::NotConfigured(
            "destination object-store location is incomplete".into(),
        ));
    }

    // Best-effort size query so progress can be shown as a percentage.
    let total_size = match backend.stat_object(src, key).await {
        Ok(Some(stat)) => stat.size,
        Ok(None) => -1,
        Err(e) => {
            warn!(key, error = %e, "could not determine source size");
            -1
        }
    };

    let job = backend.copy_object(src, dst, key).await?;
    info!(job = %job, key, total_size, "copy job submitted");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            _ = tokio::time::sleep(JOB_POLL_INTERVAL) => {}
        }

        let status = match backend.job_status(job).await {
            Ok(status) => status,
            // Keep polling on transient errors.
            Err(e) => {
                warn!(job = %job, error = %e, "job status poll failed; retrying");
                continue;
            }
        };

        if status.finished {
            if status.success {
                info!(job = %job, key, duration_secs = status.duration, "copy job finished");
                return Ok(status.duration);
            }
            return Err(TransferError::JobFailed {
                detail: status.error,
                duration: status.duration,
            });
        }

        report_progress(backend, total_size).await;
    }
}

/// Sample the throughput counter and log progress for a running job.
/// Percentage only when the total size is known; raw throughput otherwise.
async fn report_progress(backend: &dyn TransferBackend, total_size: i64) {
    let stats = match backend.stats().await {
        Ok(stats) => stats,
        Err(_) => return,
    };
    let speed_mb = stats.speed / 1024.0 / 1024.0;
    if total_size > 0 {
        let percent = ((stats.bytes as f64 / total_size as f64) * 100.0).min(100.0);
        info!(
            percent = format!("{:.1}", percent),
            speed_mb = format!("{:.2}", speed_mb),
            "copy progress"
        );
    } else {
        info!(speed_mb = format!("{:.2}", speed_mb), "copy progress");
    }
}

/// Poll until `key` is visible at `location`.
///
/// An absent object (including a not-found RPC answer) keeps the poll
/// going; any other backend error is fatal and returned immediately. The
/// deadline elapsing while the object is still absent is a timeout error.
pub async fn wait_until_object_exists(
    backend: &dyn TransferBackend,
    location: &StoreLocation,
    key: &str,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let started = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        if backend.stat_object(location, key).await?.is_some() {
            info!(key, "object is visible");
            return Ok(());
        }

        if started.elapsed() >= timeout {
            return Err(TransferError::Timeout {
                key: key.to_string(),
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JobId, JobStatus, ObjectStat, TransferStats};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn location(bucket: &str) -> StoreLocation {
        StoreLocation {
            endpoint: "https://s3.example".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: bucket.into(),
        }
    }

    /// Backend scripted per call site.
    #[derive(Default)]
    struct ScriptedBackend {
        /// Successive stat answers; `Err` entries are non-notfound failures.
        stat_script: Mutex<Vec<Result<Option<ObjectStat>, TransferError>>>,
        /// Successive job status answers.
        status_script: Mutex<Vec<Result<JobStatus, TransferError>>>,
        copies: AtomicU32,
        stat_calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn running() -> JobStatus {
            JobStatus {
                finished: false,
                ..JobStatus::default()
            }
        }

        fn finished(success: bool, error: &str, duration: f64) -> JobStatus {
            JobStatus {
                finished: true,
                success,
                error: error.to_string(),
                duration,
            }
        }
    }

    #[async_trait]
    impl TransferBackend for ScriptedBackend {
        async fn stat_object(
            &self,
            _location: &StoreLocation,
            _key: &str,
        ) -> Result<Option<ObjectStat>, TransferError> {
            self.stat_calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.stat_script.lock().unwrap();
            if script.is_empty() {
                return Ok(None);
            }
            script.remove(0)
        }

        async fn copy_object(
            &self,
            _src: &StoreLocation,
            _dst: &StoreLocation,
            _key: &str,
        ) -> Result<JobId, TransferError> {
            self.copies.fetch_add(1, Ordering::SeqCst);
            Ok(JobId(7))
        }

        async fn job_status(&self, _id: JobId) -> Result<JobStatus, TransferError> {
            let mut script = self.status_script.lock().unwrap();
            if script.is_empty() {
                return Ok(Self::finished(true, "", 0.0));
            }
            script.remove(0)
        }

        async fn stats(&self) -> Result<TransferStats, TransferError> {
            Ok(TransferStats {
                bytes: 512,
                speed: 1024.0 * 1024.0,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_returns_duration_on_success() {
        let backend = ScriptedBackend {
            stat_script: Mutex::new(vec![Ok(Some(ObjectStat { size: 1024 }))]),
            status_script: Mutex::new(vec![
                Ok(ScriptedBackend::running()),
                Ok(ScriptedBackend::running()),
                Ok(ScriptedBackend::finished(true, "", 12.5)),
            ]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        let duration = transfer(&backend, &location("src"), &location("dst"), "a.img", &cancel)
            .await
            .unwrap();
        assert_eq!(duration, 12.5);
        assert_eq!(backend.copies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_wraps_remote_failure() {
        let backend = ScriptedBackend {
            status_script: Mutex::new(vec![Ok(ScriptedBackend::finished(
                false,
                "checksum mismatch",
                3.0,
            ))]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        let err = transfer(&backend, &location("src"), &location("dst"), "a.img", &cancel)
            .await
            .unwrap_err();
        match err {
            TransferError::JobFailed { detail, duration } => {
                assert_eq!(detail, "checksum mismatch");
                assert_eq!(duration, 3.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_survives_transient_status_errors() {
        let backend = ScriptedBackend {
            status_script: Mutex::new(vec![
                Err(TransferError::Rpc {
                    op: "job/status".into(),
                    status: 500,
                    message: "hiccup".into(),
                }),
                Ok(ScriptedBackend::finished(true, "", 1.0)),
            ]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        let duration = transfer(&backend, &location("src"), &location("dst"), "a.img", &cancel)
            .await
            .unwrap();
        assert_eq!(duration, 1.0);
    }

    #[tokio::test]
    async fn test_transfer_rejects_incomplete_locations() {
        let backend = ScriptedBackend::default();
        let cancel = CancellationToken::new();
        let mut src = location("src");
        src.secret_key.clear();
        let err = transfer(&backend, &src, &location("dst"), "a.img", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotConfigured(_)));
        // Nothing was submitted.
        assert_eq!(backend.copies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_with_unknown_size_still_copies() {
        let backend = ScriptedBackend {
            stat_script: Mutex::new(vec![Err(TransferError::Rpc {
                op: "operations/stat".into(),
                status: 500,
                message: "backend exploded".into(),
            })]),
            status_script: Mutex::new(vec![
                Ok(ScriptedBackend::running()),
                Ok(ScriptedBackend::finished(true, "", 2.0)),
            ]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        let duration = transfer(&backend, &location("src"), &location("dst"), "a.img", &cancel)
            .await
            .unwrap();
        assert_eq!(duration, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_poll_retries_absence() {
        let backend = ScriptedBackend {
            stat_script: Mutex::new(vec![Ok(None), Ok(None), Ok(Some(ObjectStat { size: 5 }))]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        wait_until_object_exists(
            &backend,
            &location("dst"),
            "a.img",
            Duration::from_secs(5),
            Duration::from_secs(300),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(backend.stat_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_poll_aborts_on_hard_error() {
        let backend = ScriptedBackend {
            stat_script: Mutex::new(vec![Err(TransferError::Rpc {
                op: "operations/stat".into(),
                status: 403,
                message: "permission denied".into(),
            })]),
            ..ScriptedBackend::default()
        };
        let cancel = CancellationToken::new();
        let err = wait_until_object_exists(
            &backend,
            &location("dst"),
            "a.img",
            Duration::from_secs(5),
            Duration::from_secs(300),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransferError::Rpc { status: 403, .. }));
        // No further polling after a hard error.
        assert_eq!(backend.stat_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_poll_times_out() {
        let backend = ScriptedBackend::default();
        let cancel = CancellationToken::new();
        let err = wait_until_object_exists(
            &backend,
            &location("dst"),
            "a.img",
            Duration::from_millis(100),
            Duration::from_secs(1),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransferError::Timeout { .. }));
    }
}
