//! Error types for payload resolution and cleanup.

use scriptbox_common::{NamingError, PathError};
use thiserror::Error;

/// Errors that stop payload resolution before any network activity.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The completion directory path cannot be used.
    #[error("Invalid completion directory: {0}")]
    InvalidDirectory(#[from] PathError),

    /// Renaming the completion directory to its hash failed.
    #[error("Failed to rename directory {from} to {to}: {source}")]
    DirectoryRenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    /// No regular, non-hidden file exists under the completion directory.
    #[error("No payload file found under {directory}")]
    NoPayloadFound { directory: String },

    /// No naming strategy matched.
    #[error("Naming mismatch in {directory}: {source}")]
    NamingMismatch {
        directory: String,
        #[source]
        source: NamingError,
    },

    /// Both copy strategies failed.
    #[error("Failed to copy {from} to {to}: {message}")]
    CopyFailed {
        from: String,
        to: String,
        message: String,
    },
}

/// Non-fatal failure to delete the source directory after upload.
#[derive(Debug, Error)]
#[error("Failed to delete {directory}: {source}")]
pub struct CleanupWarning {
    /// Directory that could not be deleted.
    pub directory: String,
    #[source]
    pub source: std::io::Error,
}
