//! # tunewatch-core
//!
//! Domain vocabulary shared by the watch engine, the job service clients and
//! the HTTP API:
//!
//! - validated request values (`Account`, `FinetuneName`, `KeyValue`, ...)
//! - `TrainingStatus` and its terminal/success classification
//! - `JobHandle` / `JobDetail` records
//! - the `JobManager` contract for creating and controlling jobs

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod job;
pub mod manager;
pub mod status;
pub mod types;

pub use error::{Error, Result};
pub use job::{FinetuneSpec, JobDetail, JobHandle, TaskKind};
pub use manager::JobManager;
pub use status::{TIMEOUT_STATUS, TrainingStatus};
pub use types::{
    Account, CustomizedKey, DEFAULT_MODEL, FinetuneDesc, FinetuneName, KeyValue, ModelName,
};
