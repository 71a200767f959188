//! Job management contract used by the HTTP layer.
//!
//! The watch engine never creates or deletes jobs; it only observes them
//! through `tunewatch_reconciler::JobStatusProvider`.

use async_trait::async_trait;

use crate::error::Result;
use crate::job::{FinetuneSpec, JobHandle};

/// Lifecycle operations on jobs owned by the external job service.
#[async_trait]
pub trait JobManager: Send + Sync {
    /// Submit a new job and return where its logs and outputs will land.
    async fn create(&self, spec: &FinetuneSpec) -> Result<JobHandle>;

    /// Delete a job record from the job service.
    async fn delete(&self, job_id: &str) -> Result<()>;

    /// Stop a running job.
    async fn terminate(&self, job_id: &str) -> Result<()>;

    /// Temporary URL for downloading the log of a running job.
    async fn log_download_url(&self, job_id: &str) -> Result<String>;

    /// Temporary URL for downloading an object produced by a job.
    async fn file_download_url(&self, path: &str) -> Result<String>;
}
