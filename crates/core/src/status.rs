//! Training job status as reported by the job provider.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status string written when a job is force-terminated after its timeout.
pub const TIMEOUT_STATUS: &str = "Timeout";

/// Phase of an externally managed training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingStatus {
    Failed,
    Pending,
    Running,
    Creating,
    Abnormal,
    Completed,
    Terminated,
    Terminating,
}

impl TrainingStatus {
    /// Map a provider phase string, case-insensitively.
    ///
    /// Phases the provider may add later are treated as `Failed`.
    #[must_use]
    pub fn from_phase(phase: &str) -> Self {
        match phase.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "creating" => Self::Creating,
            "abnormal" => Self::Abnormal,
            "completed" => Self::Completed,
            "terminated" => Self::Terminated,
            "terminating" => Self::Terminating,
            _ => Self::Failed,
        }
    }

    /// Whether the job can make no further progress.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Abnormal | Self::Completed | Self::Terminated
        )
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "Failed",
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Creating => "Creating",
            Self::Abnormal => "Abnormal",
            Self::Completed => "Completed",
            Self::Terminated => "Terminated",
            Self::Terminating => "Terminating",
        }
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
