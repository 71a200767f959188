//! Core types for the reconciler.

use serde::{Deserialize, Serialize};
use tunewatch_core::{Account, JobHandle};

/// Key under which a job's results are reported.
///
/// Never mutated after the job is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIndex {
    /// Owning account.
    pub user: Account,
    /// Finetune id assigned by the caller.
    pub finetune_id: String,
    /// Model name.
    pub model: String,
}

impl JobIndex {
    /// Create a new job index.
    pub fn new(user: Account, finetune_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            user,
            finetune_id: finetune_id.into(),
            model: model.into(),
        }
    }
}

/// Last known externally observed state of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Status string, a `TrainingStatus` name or `TIMEOUT_STATUS`.
    pub status: String,
    /// Run time in seconds.
    pub duration: u64,
    /// Object path of the job log, empty until resolved.
    pub log_path: String,
    /// Object path of the packaged output, empty unless the job succeeded.
    pub output_zip_path: String,
}

/// Which probes have finished for a job.
///
/// Each flag can only move from `false` to `true`; there is no way to reset
/// one, so repeated checks never undo progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeFlags {
    status_resolved: bool,
    succeeded: bool,
    log_resolved: bool,
    output_resolved: bool,
}

impl ProbeFlags {
    /// Fresh flags with nothing resolved.
    pub const fn new() -> Self {
        Self {
            status_resolved: false,
            succeeded: false,
            log_resolved: false,
            output_resolved: false,
        }
    }

    /// Record the terminal status. `succeeded` is fixed by the first call.
    pub fn resolve_status(&mut self, succeeded: bool) {
        if !self.status_resolved {
            self.status_resolved = true;
            self.succeeded = succeeded;
        }
    }

    pub fn resolve_log(&mut self) {
        self.log_resolved = true;
    }

    pub fn resolve_output(&mut self) {
        self.output_resolved = true;
    }

    pub const fn status_resolved(&self) -> bool {
        self.status_resolved
    }

    pub const fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub const fn log_resolved(&self) -> bool {
        self.log_resolved
    }

    pub const fn output_resolved(&self) -> bool {
        self.output_resolved
    }

    /// Done once status and log are resolved, and the output too for
    /// successful jobs.
    pub const fn is_done(&self) -> bool {
        self.status_resolved && self.log_resolved && (!self.succeeded || self.output_resolved)
    }
}

/// One tracked job, travelling through the watch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedJob {
    /// Report key.
    pub index: JobIndex,
    /// Provider-side identity.
    pub handle: JobHandle,
    /// Last known state.
    pub snapshot: JobSnapshot,
    /// Probe progress.
    pub flags: ProbeFlags,
}

impl WatchedJob {
    /// Start tracking a freshly created job.
    pub fn new(index: JobIndex, handle: JobHandle) -> Self {
        Self {
            index,
            handle,
            snapshot: JobSnapshot::default(),
            flags: ProbeFlags::new(),
        }
    }

    /// Provider job id.
    pub fn job_id(&self) -> &str {
        &self.handle.job_id
    }

    pub const fn is_done(&self) -> bool {
        self.flags.is_done()
    }
}

/// What the watch loop did with a job after checking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Final snapshot reported and capacity released.
    Retired,
    /// Put back at the tail of the queue for the next lap.
    Requeued,
}

/// Counters collected over the lifetime of a watch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// Completed laps.
    pub laps: u64,
    /// Reconciliation steps run.
    pub checks: u64,
    /// Snapshots accepted by the sink.
    pub reports_sent: u64,
    /// Snapshots the sink rejected.
    pub reports_failed: u64,
    /// Jobs retired after a confirmed final report.
    pub retired: u64,
}
