//! Collaborator contracts consumed by the watch engine.

use async_trait::async_trait;
use tunewatch_core::JobDetail;

use crate::error::Result;
use crate::types::{JobIndex, JobSnapshot};

/// Read-mostly view of the external job service.
#[async_trait]
pub trait JobStatusProvider: Send + Sync {
    /// Current phase and run time of a job.
    async fn get_detail(&self, job_id: &str) -> Result<JobDetail>;

    /// Force-stop a job.
    async fn terminate(&self, job_id: &str) -> Result<()>;

    /// Object path of the log written under `log_dir`.
    async fn locate_log(&self, log_dir: &str) -> Result<String>;

    /// Package everything under `output_dir` into an archive and return its
    /// path. An empty path means there was nothing to package.
    async fn package_output(&self, output_dir: &str) -> Result<String>;
}

/// Downstream store for job snapshots.
///
/// Must accept repeated reports for the same index, each at least as
/// complete as the previous one.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Durably record the snapshot for `index`.
    async fn report(&self, index: &JobIndex, snapshot: &JobSnapshot) -> Result<()>;

    /// Release the connection. Called once, after the watch loop has stopped.
    async fn close(&self) {}
}
