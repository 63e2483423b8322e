//! Error types for storage operations.

use thiserror::Error;

/// Errors returned by a `StorageClient` backend.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// The object store rejected the request or the transport failed.
    #[error("{operation} failed for s3://{bucket}/{key}{}: {message}", status_suffix(.status))]
    RequestFailed {
        operation: &'static str,
        bucket: String,
        key: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        message: String,
    },

    /// The request did not finish within the configured bound.
    #[error("{operation} timed out after {seconds}s for {key}")]
    Timeout {
        operation: &'static str,
        key: String,
        seconds: u64,
    },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl StorageError {
    /// HTTP status of the failed request, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

/// Terminal failures of an upload.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The payload could not be inspected before upload.
    #[error("Cannot read payload {path}: {source}")]
    PayloadUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Single PUT failed.
    #[error("Upload of {key} failed: {source}")]
    TransportFailure {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The store did not return a multipart session identifier.
    #[error("Failed to initiate multipart upload of {key}: {message}")]
    InitiateFailed { key: String, message: String },

    /// At least one part has no ETag; the session was not committed.
    #[error(
        "Multipart upload {upload_id} of {key} incomplete: {recorded}/{expected} parts, missing {missing:?}"
    )]
    IncompletePartSet {
        key: String,
        upload_id: String,
        expected: usize,
        recorded: usize,
        missing: Vec<u32>,
    },

    /// Finalizing the session failed.
    #[error("Failed to complete multipart upload {upload_id} of {key}: {source}")]
    CommitFailed {
        key: String,
        upload_id: String,
        #[source]
        source: StorageError,
    },
}
