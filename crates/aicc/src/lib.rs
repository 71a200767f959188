#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # tunewatch-aicc
//!
//! Collaborators that connect the watch engine to the AICC training-job
//! service and to OBS object storage.
//!
//! - [`AiccClient`]: token-authenticated REST client for training jobs
//! - [`ObsHelper`]: log lookup, output packaging and URL signing via `obsutil`
//! - [`AiccProvider`]: implements both `JobManager` and `JobStatusProvider`
//! - [`HttpReportSink`]: PUTs job snapshots to the finetune result store
//!
//! ## Example
//!
//! ```ignore
//! use tunewatch_aicc::{AiccClient, AiccProvider, HttpReportSink, ObsHelper};
//!
//! let storage = ObsHelper::new(obs, upload);
//! storage.init().await?;
//!
//! let provider = AiccProvider::new(AiccClient::with_config(aicc)?, storage, finetune);
//! let sink = HttpReportSink::with_config(&report)?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod sink;
pub mod storage;
pub mod types;

pub use client::AiccClient;
pub use config::{AiccConfig, FinetuneConfig, ModelConfig, ObsConfig, ReportConfig, UploadConfig};
pub use error::{Error, Result};
pub use provider::{AiccProvider, JobLayout, create_option};
pub use sink::HttpReportSink;
pub use storage::ObsHelper;
pub use types::{Job, JobCreateOption, JobStatus};
