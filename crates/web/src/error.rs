//! Error handling with RFC 7807 Problem Details for JSON responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tunewatch_core::Error> for AppError {
    fn from(err: tunewatch_core::Error) -> Self {
        if err.is_validation() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<tunewatch_reconciler::Error> for AppError {
    fn from(err: tunewatch_reconciler::Error) -> Self {
        use tunewatch_reconciler::Error;

        match err {
            Error::Factory(inner) => inner.into(),
            unavailable @ (Error::CapacityExceeded { .. } | Error::QueueClosed | Error::LoopStopped) => {
                Self::ServiceUnavailable(unavailable.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    problem_type: Option<String>,
    title: String,
    status: u16,
    detail: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem_type: None,
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        let status = err.status_code();
        let title = status.canonical_reason().unwrap_or("Error");

        Self::new(status, title, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let response = ErrorResponse::from_error(&self);
        (status, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_maps_to_unavailable() {
        let err: AppError = tunewatch_reconciler::Error::CapacityExceeded { max: 2 }.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("exceed max watch num (2)"));
    }

    #[test]
    fn test_stopped_watcher_maps_to_unavailable() {
        let err: AppError = tunewatch_reconciler::Error::LoopStopped.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_factory_errors_keep_their_class() {
        let invalid: AppError =
            tunewatch_reconciler::Error::Factory(tunewatch_core::Error::unsupported_model("x"))
                .into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let failed: AppError =
            tunewatch_reconciler::Error::Factory(tunewatch_core::Error::external("down")).into();
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_problem_document_fields() -> std::result::Result<(), serde_json::Error> {
        let body = ErrorResponse::from_error(&AppError::BadRequest("empty key".to_string()));
        let json = serde_json::to_value(&body)?;
        assert_eq!(json["status"], 400);
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["detail"], "Invalid request: empty key");
        assert!(json["type"].is_null());
        Ok(())
    }
}
