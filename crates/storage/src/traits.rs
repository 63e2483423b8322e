//! Storage traits/interfaces for S3 operations.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::session::CompletionManifest;

/// User metadata attached to an uploaded object.
pub type ObjectMetadata = HashMap<String, String>;

/// Low-level S3 operations - implemented by each backend.
///
/// Operations that yield an ETag or session identifier return `Ok(None)` when
/// the store answered successfully but omitted it.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload a whole file in one request. Returns the object ETag.
    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError>;

    /// Start a multipart upload. Returns the upload ID.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError>;

    /// Upload `length` bytes of `file_path` starting at `offset` as one part.
    /// Returns the part ETag.
    #[allow(clippy::too_many_arguments)]
    async fn upload_part_from_file_range(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        file_path: &Path,
        offset: u64,
        length: u64,
    ) -> Result<Option<String>, StorageError>;

    /// Finalize a multipart upload. Returns the object ETag.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        manifest: &CompletionManifest,
    ) -> Result<Option<String>, StorageError>;

    /// Discard a multipart upload and its stored parts.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError>;
}
