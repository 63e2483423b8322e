//! Error types for the S3 backend.

use scriptbox_storage::StorageError;
use thiserror::Error;

/// Errors raised while building the S3 client.
#[derive(Error, Debug)]
pub enum S3BackendError {
    /// The endpoint is not an absolute http(s) URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<S3BackendError> for StorageError {
    fn from(err: S3BackendError) -> Self {
        StorageError::InvalidConfig {
            message: err.to_string(),
        }
    }
}
