//! Error types for the aicc crate.

use thiserror::Error;

/// Result type for aicc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the job service, object storage
/// or the report endpoint.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to obtain an auth token.
    #[error("auth failed: {reason}")]
    AuthFailed { reason: String },

    /// The remote service answered with an unexpected status.
    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus { operation: String, status: u16 },

    /// Invalid response body.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Storage CLI or upload script failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// No job settings exist for the model.
    #[error("unsupported model: {model}")]
    UnsupportedModel { model: String },

    /// The report sink has been closed.
    #[error("report sink closed")]
    SinkClosed,

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] tunewatch_core::Error),
}

impl Error {
    /// Create an auth failed error.
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Create an unexpected status error.
    pub fn unexpected_status(operation: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status: status.as_u16(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create an execution failed error.
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Convert into the watch engine's error for a failed probe.
    pub fn into_probe(self, probe: &str) -> tunewatch_reconciler::Error {
        tunewatch_reconciler::Error::probe_failed(probe, self.to_string())
    }
}

impl From<Error> for tunewatch_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::UnsupportedModel { model } => Self::unsupported_model(model),
            other => Self::external(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_display() {
        let err = Error::unexpected_status("create job", reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "create job returned unexpected status 400");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = Error::unexpected_status("get job", reqwest::StatusCode::BAD_GATEWAY);
        assert!(err.is_retryable());
        assert!(!Error::auth_failed("no token").is_retryable());
        assert!(!Error::SinkClosed.is_retryable());
    }

    #[test]
    fn test_into_core_error() {
        let err: tunewatch_core::Error = Error::UnsupportedModel {
            model: "pangu".to_string(),
        }
        .into();
        assert!(matches!(err, tunewatch_core::Error::UnsupportedModel { .. }));

        let err: tunewatch_core::Error = Error::execution_failed("boom").into();
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_into_probe_error() {
        let err = Error::execution_failed("ls failed").into_probe("log");
        assert!(err.to_string().starts_with("log probe failed"));
    }
}
