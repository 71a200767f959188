//! Finetune application service.
//!
//! Creation goes through [`Watcher::apply`] so that a job is only created
//! when a watch slot is free, and every created job is tracked until its
//! final snapshot is reported. The remaining operations pass straight
//! through to the job manager.

use std::sync::Arc;

use tracing::info;
use tunewatch_core::{FinetuneSpec, JobHandle, JobManager};
use tunewatch_reconciler::{JobIndex, WatchedJob, Watcher};

pub struct FinetuneService {
    watcher: Arc<Watcher>,
    manager: Arc<dyn JobManager>,
}

impl FinetuneService {
    pub fn new(watcher: Arc<Watcher>, manager: Arc<dyn JobManager>) -> Self {
        Self { watcher, manager }
    }

    /// Create a job for `spec` and start watching it.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` without touching the job service when all
    /// watch slots are taken, or the job manager's error when creation fails.
    pub async fn create(&self, spec: FinetuneSpec) -> tunewatch_reconciler::Result<JobHandle> {
        let manager = Arc::clone(&self.manager);

        let handle = self
            .watcher
            .apply(move || async move {
                let handle = manager.create(&spec).await?;
                let index = JobIndex::new(
                    spec.user,
                    spec.id,
                    spec.model.unwrap_or_default().as_str(),
                );
                Ok(WatchedJob::new(index, handle))
            })
            .await?;

        info!(job_id = %handle.job_id, "Finetune job created");
        Ok(handle)
    }

    pub async fn delete(&self, job_id: &str) -> tunewatch_core::Result<()> {
        self.manager.delete(job_id).await
    }

    pub async fn terminate(&self, job_id: &str) -> tunewatch_core::Result<()> {
        self.manager.terminate(job_id).await
    }

    pub async fn log_download_url(&self, job_id: &str) -> tunewatch_core::Result<String> {
        self.manager.log_download_url(job_id).await
    }

    pub async fn file_download_url(&self, path: &str) -> tunewatch_core::Result<String> {
        self.manager.file_download_url(path).await
    }

    /// Jobs currently tracked.
    pub fn tracked(&self) -> usize {
        self.watcher.current()
    }

    pub fn capacity(&self) -> usize {
        self.watcher.max()
    }
}
