//! Per-job state machine.

use std::sync::Arc;

use tracing::{debug, error, warn};
use tunewatch_core::TIMEOUT_STATUS;

use crate::provider::JobStatusProvider;
use crate::types::WatchedJob;

/// Advances one tracked job by probing the job provider.
///
/// Probes run in the order status, log, output, each gated by its flag.
/// A failed probe leaves its flag unset so the job simply retries on the
/// next lap; nothing here blocks other jobs for longer than one call.
pub struct Reconciler {
    /// Job service being observed.
    provider: Arc<dyn JobStatusProvider>,
    /// Run time in seconds after which a job is force-terminated.
    timeout_secs: u64,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(provider: Arc<dyn JobStatusProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout_secs,
        }
    }

    /// Run one reconciliation step, returning whether the snapshot changed.
    pub async fn check(&self, job: &mut WatchedJob) -> bool {
        let mut changed = false;

        if !job.flags.status_resolved() {
            match self.probe_status(job).await {
                StatusProbe::Resolved { changed: c } => changed |= c,
                StatusProbe::Unresolved { changed: c } => return c,
            }
        }

        if !job.flags.log_resolved() {
            match self.provider.locate_log(&job.handle.log_dir).await {
                Ok(path) => {
                    job.snapshot.log_path = path;
                    job.flags.resolve_log();
                    changed = true;
                }
                Err(e) => {
                    error!(job_id = %job.job_id(), error = %e, "generate log failed");
                }
            }
        }

        // Failed, aborted and timed-out jobs have no output to package.
        if !job.flags.succeeded() {
            return changed;
        }

        if !job.flags.output_resolved() {
            match self.provider.package_output(&job.handle.output_dir).await {
                Ok(path) => {
                    job.flags.resolve_output();
                    if !path.is_empty() {
                        job.snapshot.output_zip_path = path;
                        changed = true;
                    }
                }
                Err(e) => {
                    error!(job_id = %job.job_id(), error = %e, "generate output failed");
                }
            }
        }

        changed
    }

    async fn probe_status(&self, job: &mut WatchedJob) -> StatusProbe {
        let detail = match self.provider.get_detail(job.job_id()).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(job_id = %job.job_id(), error = %e, "get job detail failed");
                return StatusProbe::Unresolved { changed: false };
            }
        };

        let mut changed = false;
        let snapshot = &mut job.snapshot;

        if detail.duration != snapshot.duration {
            snapshot.duration = detail.duration;
            changed = true;
        }

        if detail.status.as_str() != snapshot.status {
            snapshot.status = detail.status.as_str().to_string();
            changed = true;
        }

        if detail.status.is_done() {
            job.flags.resolve_status(detail.status.is_success());
            return StatusProbe::Resolved { changed };
        }

        if detail.duration < self.timeout_secs {
            return StatusProbe::Unresolved { changed };
        }

        debug!(
            job_id = %job.job_id(),
            duration = detail.duration,
            timeout = self.timeout_secs,
            "job exceeded its timeout, terminating"
        );

        if let Err(e) = self.provider.terminate(job.job_id()).await {
            error!(job_id = %job.job_id(), error = %e, "terminate the job failed");
            return StatusProbe::Unresolved { changed };
        }

        job.snapshot.status = TIMEOUT_STATUS.to_string();
        job.flags.resolve_status(false);
        StatusProbe::Resolved { changed: true }
    }

    /// Timeout applied to every job, in seconds.
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

/// Outcome of the status probe.
enum StatusProbe {
    /// The job reached a terminal state (possibly by forced termination).
    Resolved { changed: bool },
    /// The job is still running, or the probe failed.
    Unresolved { changed: bool },
}
