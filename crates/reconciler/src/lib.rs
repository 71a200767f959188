//! Reconciliation loop that watches external finetune jobs.
//!
//! Every admitted job is driven through the same sequence until it is fully
//! reported:
//!
//! 1. Poll its status until it reaches a terminal phase, force-terminating
//!    it once it outlives the configured timeout
//! 2. Locate its log
//! 3. For successful jobs, package its output directory
//!
//! A single loop task owns the watch queue and processes jobs one at a
//! time. A lap marker circulates through the queue; each time it reaches
//! the head the loop waits out the rest of the interval, so no job is
//! checked more often than once per interval. Probe failures never drop a
//! job, they are retried on the next lap.
//!
//! Progress is pushed to a [`ReportSink`] whenever a check changes a job's
//! snapshot. A job leaves the loop, and frees its capacity slot, only after
//! the sink has accepted its final snapshot.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tunewatch_reconciler::{WatchConfig, Watcher, WatchedJob, JobIndex};
//!
//! let watcher = Watcher::start(&WatchConfig::default(), provider, sink)?;
//!
//! let handle = watcher
//!     .apply(|| async {
//!         let handle = manager.create(&spec).await?;
//!         Ok(WatchedJob::new(JobIndex::new(user, finetune_id, model), handle))
//!     })
//!     .await?;
//!
//! // On shutdown
//! watcher.exit().await;
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod capacity;
pub mod config;
pub mod error;
pub mod r#loop;
pub mod provider;
pub mod queue;
pub mod reconciler;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod watcher;

// Re-export main types
pub use capacity::CapacityGate;
pub use config::WatchConfig;
pub use error::{Error, Result};
pub use provider::{JobStatusProvider, ReportSink};
pub use queue::{LapPacer, QueueEntry, QueueReceiver, QueueSender, WatchQueue};
pub use r#loop::{LoopStopper, WatchLoop};
pub use reconciler::Reconciler;
pub use types::{Disposition, JobIndex, JobSnapshot, LoopStats, ProbeFlags, WatchedJob};
pub use watcher::Watcher;
