//! Watch queue and lap pacing.
//!
//! The queue is a bounded FIFO of tracked jobs plus one lap marker. Every time
//! the marker reaches the head, one full pass over the tracked jobs has
//! finished; the loop then waits out the rest of the interval before putting
//! a fresh marker at the tail.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::types::WatchedJob;

/// One slot in the watch queue.
#[derive(Debug)]
pub enum QueueEntry {
    /// End-of-lap marker.
    Lap,
    /// A tracked job.
    Job(Box<WatchedJob>),
}

/// Factory for the bounded watch queue.
pub struct WatchQueue;

impl WatchQueue {
    /// Create a queue that holds `max_watch_num` jobs plus the lap marker.
    ///
    /// With at most `max_watch_num` jobs admitted, producers and the loop's
    /// own requeue never wait on each other.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when `max_watch_num` is zero.
    pub fn new(max_watch_num: usize) -> Result<(QueueSender, QueueReceiver)> {
        if max_watch_num == 0 {
            return Err(Error::invalid_config("max_watch_num must be greater than 0"));
        }
        let (tx, rx) = mpsc::channel(max_watch_num.saturating_add(1));
        Ok((QueueSender { tx }, QueueReceiver { rx }))
    }
}

/// Producer side of the watch queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<QueueEntry>,
}

impl QueueSender {
    /// Append a job at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueueClosed` once the loop has dropped the receiver.
    pub async fn push_job(&self, job: WatchedJob) -> Result<()> {
        self.tx
            .send(QueueEntry::Job(Box::new(job)))
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Append a lap marker at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueueClosed` once the loop has dropped the receiver.
    pub async fn push_lap(&self) -> Result<()> {
        self.tx
            .send(QueueEntry::Lap)
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Free entry slots right now.
    pub fn free_slots(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer side of the watch queue, owned by the watch loop.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<QueueEntry>,
}

impl QueueReceiver {
    /// Take the entry at the head, waiting if the queue is empty.
    pub async fn pop(&mut self) -> Option<QueueEntry> {
        self.rx.recv().await
    }

    /// Number of entries waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Keeps laps at least `interval` apart.
#[derive(Debug, Clone)]
pub struct LapPacer {
    interval: Duration,
    lap_start: Instant,
}

impl LapPacer {
    /// Start pacing; the current instant is the start of the first lap.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            lap_start: Instant::now(),
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// When the current lap started.
    pub const fn lap_start(&self) -> Instant {
        self.lap_start
    }

    /// How long the next lap still has to wait at `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.lap_start
            .checked_add(self.interval)
            .map_or(Duration::ZERO, |deadline| deadline.saturating_duration_since(now))
    }

    /// Sleep out the remainder of the interval, then start a new lap.
    pub async fn wait_for_next_lap(&mut self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        self.lap_start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use tunewatch_core::{Account, JobHandle};

    use super::*;
    use crate::types::JobIndex;

    fn job(id: &str) -> Result<WatchedJob> {
        let user = Account::new("u1").map_err(Error::from)?;
        Ok(WatchedJob::new(
            JobIndex::new(user, id, "wukong"),
            JobHandle::new(id, "logs/u1/", "out/u1/"),
        ))
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(WatchQueue::new(0), Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_fifo_order() -> Result<()> {
        let (tx, mut rx) = WatchQueue::new(2)?;
        tx.push_job(job("a")?).await?;
        tx.push_job(job("b")?).await?;
        tx.push_lap().await?;

        let ids: Vec<String> = [rx.pop().await, rx.pop().await]
            .into_iter()
            .flatten()
            .filter_map(|e| match e {
                QueueEntry::Job(j) => Some(j.handle.job_id.clone()),
                QueueEntry::Lap => None,
            })
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(rx.pop().await, Some(QueueEntry::Lap)));
        Ok(())
    }

    #[tokio::test]
    async fn test_holds_max_plus_marker_without_blocking() -> Result<()> {
        let (tx, rx) = WatchQueue::new(3)?;
        tx.push_lap().await?;
        for id in ["a", "b", "c"] {
            tx.push_job(job(id)?).await?;
        }
        assert_eq!(rx.len(), 4);
        assert_eq!(tx.free_slots(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped() -> Result<()> {
        let (tx, rx) = WatchQueue::new(1)?;
        drop(rx);
        assert!(matches!(tx.push_lap().await, Err(Error::QueueClosed)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_waits_out_the_interval() {
        let mut pacer = LapPacer::new(Duration::from_secs(10));
        let first = pacer.lap_start();

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(pacer.remaining(Instant::now()), Duration::from_secs(7));

        pacer.wait_for_next_lap().await;
        assert!(pacer.lap_start() - first >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_does_not_wait_after_slow_lap() {
        let mut pacer = LapPacer::new(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(15)).await;

        let before = Instant::now();
        pacer.wait_for_next_lap().await;
        assert_eq!(pacer.lap_start(), before);
    }
}
