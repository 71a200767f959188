//! # tunewatch
//!
//! Binary support: command line, config loading and signal handling. The
//! watch engine lives in `tunewatch-reconciler`, the job service and
//! storage clients in `tunewatch-aicc`, and the HTTP API in
//! `tunewatch-web`.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod config;
pub mod shutdown;

pub use cli::Cli;
pub use config::{AppConfig, ConfigError};
