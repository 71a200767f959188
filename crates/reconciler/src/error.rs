//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No capacity slot was free for a new job.
    #[error("exceed max watch num ({max})")]
    CapacityExceeded { max: usize },

    /// A status, log or output probe against the job provider failed.
    #[error("{probe} probe failed: {reason}")]
    ProbeFailed { probe: String, reason: String },

    /// The report sink rejected a snapshot.
    #[error("report failed: {reason}")]
    ReportFailed { reason: String },

    /// The job factory handed to `Watcher::apply` failed.
    #[error("job factory failed: {0}")]
    Factory(#[from] tunewatch_core::Error),

    /// The watch queue is closed.
    #[error("watch queue closed")]
    QueueClosed,

    /// The watch loop was stopped; no new jobs are admitted.
    #[error("watch loop stopped")]
    LoopStopped,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a probe failed error.
    pub fn probe_failed(probe: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            probe: probe.into(),
            reason: reason.into(),
        }
    }

    /// Create a report failed error.
    pub fn report_failed(reason: impl Into<String>) -> Self {
        Self::ReportFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error is the admission rejection.
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}
