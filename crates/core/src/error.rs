//! Core error types for tunewatch domain operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// The standard Result type for tunewatch domain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for domain validation and job management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid user name: {value:?}")]
    InvalidAccount { value: String },

    #[error("name's length should be between {min} to {max}")]
    NameLength { min: usize, max: usize },

    #[error("invalid name: {value:?}")]
    InvalidName { value: String },

    #[error("the length of desc should be less than {max}")]
    DescTooLong { max: usize },

    #[error("empty key")]
    EmptyKey,

    #[error("unsupported model: {model}")]
    UnsupportedModel { model: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    // Collaborator errors
    #[error("external service error: {reason}")]
    External { reason: String },

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Create an invalid account error.
    pub fn invalid_account(value: impl Into<String>) -> Self {
        Self::InvalidAccount {
            value: value.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(value: impl Into<String>) -> Self {
        Self::InvalidName {
            value: value.into(),
        }
    }

    /// Create an unsupported model error.
    pub fn unsupported_model(model: impl Into<String>) -> Self {
        Self::UnsupportedModel {
            model: model.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Create an external service error.
    pub fn external(reason: impl Into<String>) -> Self {
        Self::External {
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by caller input rather than a collaborator.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::External { .. } | Self::Unknown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NameLength { min: 3, max: 30 };
        assert_eq!(err.to_string(), "name's length should be between 3 to 30");
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::EmptyKey.is_validation());
        assert!(Error::invalid_account("root").is_validation());
        assert!(!Error::external("connection refused").is_validation());
    }
}
