//! The watch loop.
//!
//! A single task owns the queue receiver and processes entries one at a
//! time. Jobs flow head to tail; a lap marker circulates with them so the
//! loop knows when one pass over every tracked job has finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::capacity::CapacityGate;
use crate::provider::ReportSink;
use crate::queue::{LapPacer, QueueEntry, QueueReceiver, QueueSender};
use crate::reconciler::Reconciler;
use crate::types::{Disposition, LoopStats, WatchedJob};

/// Handle for stopping a running watch loop.
///
/// Dropping every stopper also stops the loop.
#[derive(Debug, Clone)]
pub struct LoopStopper {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl LoopStopper {
    /// Ask the loop to stop. The job being processed, if any, finishes
    /// its step first.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Drives every tracked job through repeated reconciliation steps.
pub struct WatchLoop {
    reconciler: Reconciler,
    sink: Arc<dyn ReportSink>,
    gate: Arc<CapacityGate>,
    queue: QueueReceiver,
    requeue: QueueSender,
    pacer: LapPacer,
    stop_rx: watch::Receiver<bool>,
    stats: LoopStats,
}

impl WatchLoop {
    /// Create a loop over `queue`, returning it with its stopper.
    ///
    /// `requeue` must feed the same queue `queue` drains.
    pub fn new(
        reconciler: Reconciler,
        sink: Arc<dyn ReportSink>,
        gate: Arc<CapacityGate>,
        (requeue, queue): (QueueSender, QueueReceiver),
        interval: Duration,
    ) -> (Self, LoopStopper) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let watch_loop = Self {
            reconciler,
            sink,
            gate,
            queue,
            requeue,
            pacer: LapPacer::new(interval),
            stop_rx,
            stats: LoopStats::default(),
        };
        let stopper = LoopStopper {
            stop_tx: Arc::new(stop_tx),
        };
        (watch_loop, stopper)
    }

    /// Counters collected so far.
    pub const fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until stopped, returning the collected counters.
    ///
    /// The first lap marker is enqueued here, so the first lap starts as
    /// soon as the loop does.
    pub async fn run(mut self) -> LoopStats {
        info!(interval = ?self.pacer.interval(), "watch loop started");

        if self.requeue.push_lap().await.is_err() {
            error!("watch queue closed before the loop started");
            return self.stats;
        }
        self.pacer = LapPacer::new(self.pacer.interval());

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            let entry = tokio::select! {
                biased;
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
                entry = self.queue.pop() => entry,
            };

            match entry {
                Some(QueueEntry::Lap) => {
                    if !self.finish_lap().await {
                        break;
                    }
                }
                Some(QueueEntry::Job(job)) => {
                    self.process_job(*job).await;
                }
                None => break,
            }
        }

        info!(
            laps = self.stats.laps,
            checks = self.stats.checks,
            retired = self.stats.retired,
            "watch loop stopped"
        );
        self.stats
    }

    /// Close the current lap: wait out the interval, then enqueue the next
    /// marker. Returns `false` when the loop should stop.
    async fn finish_lap(&mut self) -> bool {
        self.stats.laps = self.stats.laps.saturating_add(1);
        debug!(lap = self.stats.laps, tracked = self.gate.current(), "finish a lap");

        tokio::select! {
            biased;
            changed = self.stop_rx.changed() => {
                if changed.is_err() || *self.stop_rx.borrow() {
                    return false;
                }
                // A spurious wake-up; finish the wait.
                self.pacer.wait_for_next_lap().await;
            }
            () = self.pacer.wait_for_next_lap() => {}
        }

        if self.requeue.push_lap().await.is_err() {
            error!("watch queue closed, cannot start the next lap");
            return false;
        }
        true
    }

    /// Run one reconciliation step for `job` and decide its fate.
    ///
    /// A finished job is retired only once its final report has been
    /// accepted; otherwise it goes back to the tail of the queue. Unfinished
    /// jobs report intermediate progress whenever the step changed their
    /// snapshot.
    pub async fn process_job(&mut self, mut job: WatchedJob) -> Disposition {
        self.stats.checks = self.stats.checks.saturating_add(1);
        let changed = self.reconciler.check(&mut job).await;

        debug!(
            job_id = %job.job_id(),
            status = %job.snapshot.status,
            changed,
            done = job.is_done(),
            "checked job"
        );

        if job.is_done() {
            match self.sink.report(&job.index, &job.snapshot).await {
                Ok(()) => {
                    self.stats.reports_sent = self.stats.reports_sent.saturating_add(1);
                    self.stats.retired = self.stats.retired.saturating_add(1);
                    self.gate.release();
                    info!(
                        job_id = %job.job_id(),
                        finetune_id = %job.index.finetune_id,
                        status = %job.snapshot.status,
                        "job finished and reported"
                    );
                    return Disposition::Retired;
                }
                Err(e) => {
                    self.stats.reports_failed = self.stats.reports_failed.saturating_add(1);
                    error!(
                        job_id = %job.job_id(),
                        error = %e,
                        "report final result failed, will retry"
                    );
                }
            }
        } else if changed {
            match self.sink.report(&job.index, &job.snapshot).await {
                Ok(()) => {
                    self.stats.reports_sent = self.stats.reports_sent.saturating_add(1);
                }
                Err(e) => {
                    self.stats.reports_failed = self.stats.reports_failed.saturating_add(1);
                    warn!(job_id = %job.job_id(), error = %e, "report progress failed");
                }
            }
        }

        let job_id = job.job_id().to_string();
        if let Err(e) = self.requeue.push_job(job).await {
            // Only reachable if the receiver is gone, i.e. the loop itself.
            error!(job_id = %job_id, error = %e, "requeue job failed, dropping it");
            self.gate.release();
        }
        Disposition::Requeued
    }
}

#[cfg(test)]
mod tests {
    use tunewatch_core::{Account, JobDetail, JobHandle, TrainingStatus};

    use super::*;
    use crate::error::{Error, Result};
    use crate::queue::WatchQueue;
    use crate::testing::{RecordingSink, ScriptedProvider};
    use crate::types::JobIndex;

    fn job(id: &str) -> Result<WatchedJob> {
        let user = Account::new("u1")?;
        Ok(WatchedJob::new(
            JobIndex::new(user, id, "wukong"),
            JobHandle::new(format!("job-{id}"), "logs/u1/", "out/u1/"),
        ))
    }

    fn build(
        provider: ScriptedProvider,
        sink: Arc<RecordingSink>,
        admitted: usize,
    ) -> Result<(WatchLoop, LoopStopper, Arc<CapacityGate>)> {
        let gate = Arc::new(CapacityGate::new(4));
        for _ in 0..admitted {
            gate.admit();
        }
        let queue = WatchQueue::new(4)?;
        let reconciler = Reconciler::new(Arc::new(provider), 600);
        let (watch_loop, stopper) =
            WatchLoop::new(reconciler, sink, Arc::clone(&gate), queue, Duration::from_secs(10));
        Ok((watch_loop, stopper, gate))
    }

    #[tokio::test]
    async fn test_finished_job_is_retired() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let (mut watch_loop, _stopper, gate) = build(
            ScriptedProvider::completed(120, "logs/u1/out.log", "out/u1/a.zip"),
            Arc::clone(&sink),
            1,
        )?;

        let disposition = watch_loop.process_job(job("ft-1")?).await;

        assert_eq!(disposition, Disposition::Retired);
        assert_eq!(gate.current(), 0);
        assert_eq!(sink.reports_for("ft-1").len(), 1);
        assert_eq!(watch_loop.stats().retired, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_final_report_requeues() -> Result<()> {
        let sink = Arc::new(RecordingSink::new().failing(1));
        let (mut watch_loop, _stopper, gate) = build(
            ScriptedProvider::completed(120, "logs/u1/out.log", "out/u1/a.zip"),
            Arc::clone(&sink),
            1,
        )?;

        assert_eq!(
            watch_loop.process_job(job("ft-1")?).await,
            Disposition::Requeued
        );
        assert_eq!(gate.current(), 1);
        assert_eq!(watch_loop.queue.len(), 1);

        let Some(QueueEntry::Job(requeued)) = watch_loop.queue.pop().await else {
            return Err(Error::QueueClosed);
        };
        assert!(requeued.is_done());

        assert_eq!(
            watch_loop.process_job(*requeued).await,
            Disposition::Retired
        );
        assert_eq!(gate.current(), 0);
        assert_eq!(sink.attempts(), 2);
        assert_eq!(watch_loop.stats().reports_failed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unchanged_running_job_is_not_reported() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let (mut watch_loop, _stopper, _gate) = build(
            ScriptedProvider::new().with_detail(Ok(JobDetail::new(TrainingStatus::Running, 5))),
            Arc::clone(&sink),
            1,
        )?;

        watch_loop.process_job(job("ft-1")?).await;
        let Some(QueueEntry::Job(requeued)) = watch_loop.queue.pop().await else {
            return Err(Error::QueueClosed);
        };
        watch_loop.process_job(*requeued).await;

        assert_eq!(sink.attempts(), 1);
        assert_eq!(watch_loop.stats().checks, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_lap_wait() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let (watch_loop, stopper, _gate) = build(ScriptedProvider::new(), sink, 0)?;

        let handle = tokio::spawn(watch_loop.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        stopper.stop();
        assert!(stopper.is_stopped());

        let stats = handle.await.map_err(|e| Error::invalid_config(e.to_string()))?;
        assert_eq!(stats.laps, 1);
        assert_eq!(stats.checks, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_stopper_ends_loop() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let (watch_loop, stopper, _gate) = build(ScriptedProvider::new(), sink, 0)?;

        let handle = tokio::spawn(watch_loop.run());
        drop(stopper);

        let stats = handle.await.map_err(|e| Error::invalid_config(e.to_string()))?;
        assert_eq!(stats.checks, 0);
        Ok(())
    }
}
