//! Public face of the watch engine: admission, lifecycle and introspection.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tunewatch_core::JobHandle;

use crate::capacity::CapacityGate;
use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::provider::{JobStatusProvider, ReportSink};
use crate::queue::{QueueSender, WatchQueue};
use crate::r#loop::{LoopStopper, WatchLoop};
use crate::reconciler::Reconciler;
use crate::types::{LoopStats, WatchedJob};

/// Owns a running watch loop and admits new jobs into it.
pub struct Watcher {
    gate: Arc<CapacityGate>,
    queue: QueueSender,
    stopper: LoopStopper,
    sink: Arc<dyn ReportSink>,
    task: Mutex<Option<JoinHandle<LoopStats>>>,
}

impl Watcher {
    /// Spawn the watch loop on the current tokio runtime.
    ///
    /// Non-positive config values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when called outside a tokio runtime.
    pub fn start(
        config: &WatchConfig,
        provider: Arc<dyn JobStatusProvider>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::invalid_config(e.to_string()))?;

        let capacity = config.capacity();
        let (tx, rx) = WatchQueue::new(capacity)?;
        let gate = Arc::new(CapacityGate::new(capacity));
        let reconciler = Reconciler::new(provider, config.timeout());

        let (watch_loop, stopper) = WatchLoop::new(
            reconciler,
            Arc::clone(&sink),
            Arc::clone(&gate),
            (tx.clone(), rx),
            config.interval(),
        );
        let task = runtime.spawn(watch_loop.run());

        info!(
            interval = ?config.interval(),
            timeout = config.timeout(),
            max_watch_num = capacity,
            "watcher started"
        );

        Ok(Self {
            gate,
            queue: tx,
            stopper,
            sink,
            task: Mutex::new(Some(task)),
        })
    }

    /// Admit a new job.
    ///
    /// A capacity slot is reserved before `factory` runs, so the factory
    /// (typically the call that creates the job remotely) is never invoked
    /// when the watcher is full. If the factory fails, the slot is given
    /// back and nothing is tracked.
    ///
    /// # Errors
    ///
    /// - `Error::CapacityExceeded` when every slot is taken
    /// - `Error::Factory` when the factory fails
    /// - `Error::LoopStopped` once `exit` has been called, without invoking
    ///   the factory
    pub async fn apply<F, Fut>(&self, factory: F) -> Result<JobHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = tunewatch_core::Result<WatchedJob>>,
    {
        if self.stopper.is_stopped() {
            return Err(Error::LoopStopped);
        }
        if !self.gate.admit() {
            return Err(Error::CapacityExceeded {
                max: self.gate.max(),
            });
        }

        let job = match factory().await {
            Ok(job) => job,
            Err(e) => {
                self.gate.release();
                return Err(e.into());
            }
        };

        let handle = job.handle.clone();
        let finetune_id = job.index.finetune_id.clone();
        if let Err(e) = self.queue.push_job(job).await {
            self.gate.release();
            return Err(e);
        }

        info!(
            job_id = %handle.job_id,
            finetune_id = %finetune_id,
            tracked = self.gate.current(),
            "job admitted"
        );
        Ok(handle)
    }

    /// Stop the loop, wait for it, then close the report sink.
    ///
    /// Jobs still tracked are abandoned. Returns the loop's counters on
    /// the first call and `None` afterwards.
    pub async fn exit(&self) -> Option<LoopStats> {
        self.stopper.stop();

        let task = self.task.lock().await.take()?;
        let stats = match task.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!(error = %e, "watch loop task failed");
                None
            }
        };

        self.sink.close().await;
        info!(abandoned = self.gate.current(), "watcher exited");
        stats
    }

    /// Number of jobs currently tracked.
    pub fn current(&self) -> usize {
        self.gate.current()
    }

    /// Maximum number of tracked jobs.
    pub fn max(&self) -> usize {
        self.gate.max()
    }

    /// Whether `exit` has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }
}
