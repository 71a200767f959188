//! tunewatch Web Server
//!
//! HTTP API for creating finetune jobs and controlling them while they are
//! watched. Success bodies are wrapped as `{"data": ...}`; errors are RFC
//! 7807 problem documents.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;

pub use dto::{CreateFinetuneRequest, DataResponse, HealthResponse, KeyValueRequest, UrlResponse};
pub use error::{AppError, ErrorResponse};
pub use server::{ServerConfig, create_app, run_server};
pub use service::FinetuneService;
pub use state::AppState;
