//! Top-level error type and exit codes.

use scriptbox_filesystem::ResolutionError;
use scriptbox_storage::{StorageError, UploadError};
use thiserror::Error;

use crate::config::ConfigurationError;
use crate::logging::LoggingError;

/// Failures that end a run.
#[derive(Error, Debug)]
pub enum PostProcessError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    /// The S3 client could not be built.
    #[error("Storage client setup failed: {0}")]
    Client(#[from] StorageError),

    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl PostProcessError {
    /// Process exit code for this failure.
    ///
    /// `2` configuration, `3` resolution, `4` upload.
    pub fn exit_code(&self) -> u8 {
        match self {
            PostProcessError::Configuration(_)
            | PostProcessError::Logging(_)
            | PostProcessError::Client(_) => 2,
            PostProcessError::Resolution(_) => 3,
            PostProcessError::Upload(_) => 4,
        }
    }
}
