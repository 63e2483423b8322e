//! Shared error types used across ScriptBox crates.

use thiserror::Error;

use crate::naming::NAMING_PATTERN;

/// Path-related errors shared across crates.
#[derive(Debug, Error, Clone)]
pub enum PathError {
    /// Path has no final component or it is not valid UTF-8.
    #[error("Invalid path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: String,
    },
}

/// No naming strategy produced a hash and catalog ID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Cannot derive naming from final name {final_name:?} or directory {directory_name:?} \
     (payload {payload_name:?}); expected {expected}"
)]
pub struct NamingError {
    /// Nominal final name supplied by the download manager.
    pub final_name: String,
    /// Base name of the completion directory.
    pub directory_name: String,
    /// File name of the selected payload.
    pub payload_name: String,
    /// Human-readable description of the accepted pattern.
    pub expected: &'static str,
}

impl NamingError {
    /// Create a naming error for the given inputs.
    pub fn new(
        final_name: impl Into<String>,
        directory_name: impl Into<String>,
        payload_name: impl Into<String>,
    ) -> Self {
        Self {
            final_name: final_name.into(),
            directory_name: directory_name.into(),
            payload_name: payload_name.into(),
            expected: NAMING_PATTERN,
        }
    }
}
