//! Job-level domain records.

use serde::{Deserialize, Serialize};

use crate::status::TrainingStatus;
use crate::types::{Account, FinetuneDesc, FinetuneName, KeyValue, ModelName};

/// Identity of a job inside the provider, assigned once at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub log_dir: String,
    pub output_dir: String,
}

impl JobHandle {
    #[must_use]
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl Into<String>,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            log_dir: log_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Current status and run time of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDetail {
    pub status: TrainingStatus,
    /// Elapsed run time in seconds.
    pub duration: u64,
}

impl JobDetail {
    #[must_use]
    pub const fn new(status: TrainingStatus, duration: u64) -> Self {
        Self { status, duration }
    }
}

/// What kind of workload a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Finetune,
    Inference,
}

impl TaskKind {
    #[must_use]
    pub fn from_task(task: &str) -> Self {
        if task == "finetune" {
            Self::Finetune
        } else {
            Self::Inference
        }
    }
}

/// A validated request to run a finetune (or inference) job.
#[derive(Debug, Clone)]
pub struct FinetuneSpec {
    pub id: String,
    pub user: Account,
    pub model: Option<ModelName>,
    pub task: String,
    pub name: FinetuneName,
    pub desc: FinetuneDesc,
    pub hyperparameters: Vec<KeyValue>,
    pub env: Vec<KeyValue>,
}

impl FinetuneSpec {
    /// The model name, falling back to the default model.
    #[must_use]
    pub fn model_or_default(&self) -> ModelName {
        self.model.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn task_kind(&self) -> TaskKind {
        TaskKind::from_task(&self.task)
    }

    /// Training entry point for the model, empty for unknown models.
    #[must_use]
    pub fn default_command(&self) -> &'static str {
        match self.model_or_default().as_str() {
            "wukong" => "python train-lora.py",
            _ => "",
        }
    }

    #[must_use]
    pub fn default_inference_command(&self) -> &'static str {
        match self.model_or_default().as_str() {
            "wukong" => "python txt2img-lora.py",
            _ => "",
        }
    }

    /// Command matching the task kind.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self.task_kind() {
            TaskKind::Finetune => self.default_command(),
            TaskKind::Inference => self.default_inference_command(),
        }
    }
}
