//! Storage abstraction for uploading resolved payloads to S3-compatible stores.
//!
//! This crate provides a backend-agnostic `StorageClient` trait and the
//! `UploadOrchestrator` built on top of it:
//!
//! - **Single PUT** - Files below the multipart threshold are sent in one request
//! - **Multipart** - Larger files are split into fixed-size parts, uploaded with
//!   bounded concurrency, verified and committed with a sorted manifest
//!
//! Backends live in their own crates. With the `testing` feature,
//! `MemoryStorageClient` is an in-process backend that records every request,
//! used to exercise the orchestrator.

mod error;
// Recording backend (tests and the `testing` feature only)
#[cfg(any(test, feature = "testing"))]
pub mod memory;
mod parts;
mod session;
mod traits;
mod types;
mod upload;

pub use error::{StorageError, UploadError};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStorageClient;
pub use parts::{expected_part_count, generate_parts, needs_multipart, upload_strategy, PartInfo, UploadStrategy};
pub use session::{CompletedPartEntry, CompletionManifest, MultipartSession};
pub use traits::{ObjectMetadata, StorageClient};
pub use types::{media_object_key, S3Credentials, StorageSettings, UploadReceipt, UploadTarget};
pub use upload::{payload_metadata, UploadOptions, UploadOrchestrator};
