//! Upload orchestration for resolved payloads.
//!
//! This module provides the high-level upload operation that works with any
//! `StorageClient` implementation. It handles:
//!
//! - Size-based choice between a single PUT and the multipart protocol
//! - Parallel part uploads with a bounded number in flight
//! - Completeness verification before commit
//! - Best-effort abort of sessions that cannot be committed
//! - A timeout around every request
//!
//! # Multipart protocol
//!
//! 1. Initiate a session with the payload metadata attached
//! 2. Split the file into `part_size` ranges and upload them, at most
//!    `max_concurrency` at a time; a part without an ETag is recorded as missing
//! 3. Verify every part has an ETag, otherwise abort
//! 4. Commit a manifest sorted by part number
//!
//! # Example
//!
//! ```ignore
//! use scriptbox_storage::{UploadOrchestrator, UploadTarget};
//!
//! let orchestrator = UploadOrchestrator::new(&client);
//! let target = UploadTarget::for_payload("media", &payload, &settings);
//! let receipt = orchestrator.upload(&payload, &target).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scriptbox_common::{
    DEFAULT_REQUEST_TIMEOUT, MAX_PART_CONCURRENCY, METADATA_KEY_CATALOG_ID, METADATA_KEY_HASH,
    MULTIPART_THRESHOLD,
};
use scriptbox_filesystem::ResolvedPayload;

use crate::error::{StorageError, UploadError};
use crate::parts::{generate_parts, upload_strategy, PartInfo, UploadStrategy};
use crate::session::{CompletionManifest, MultipartSession};
use crate::traits::{ObjectMetadata, StorageClient};
use crate::types::{UploadReceipt, UploadTarget};

/// Options for upload operations.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Files of at least this size use the multipart protocol.
    pub multipart_threshold: u64,
    /// Size of each multipart part (the last may be smaller).
    pub part_size: u64,
    /// Maximum part uploads in flight.
    pub max_concurrency: usize,
    /// Upper bound for each request.
    pub request_timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            multipart_threshold: MULTIPART_THRESHOLD,
            part_size: MULTIPART_THRESHOLD,
            max_concurrency: MAX_PART_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl UploadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both the multipart threshold and the part size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.multipart_threshold = chunk_size;
        self.part_size = chunk_size;
        self
    }

    /// Set maximum concurrency for part uploads.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Metadata entries attached to every uploaded object.
pub fn payload_metadata(payload: &ResolvedPayload) -> ObjectMetadata {
    let mut metadata: ObjectMetadata = ObjectMetadata::new();
    metadata.insert(METADATA_KEY_HASH.to_string(), payload.hash.clone());
    metadata.insert(METADATA_KEY_CATALOG_ID.to_string(), payload.catalog_id.clone());
    metadata
}

/// High-level upload operations using any StorageClient implementation.
pub struct UploadOrchestrator<'a, C: StorageClient> {
    /// The storage client for S3 operations.
    client: &'a C,
    /// Upload options.
    options: UploadOptions,
}

impl<'a, C: StorageClient> UploadOrchestrator<'a, C> {
    /// Create a new upload orchestrator with default options.
    ///
    /// # Arguments
    /// * `client` - Storage client for S3 operations
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            options: UploadOptions::default(),
        }
    }

    /// Set upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload a resolved payload.
    ///
    /// # Arguments
    /// * `payload` - Payload whose `final_path` is uploaded
    /// * `target` - Destination bucket and key
    ///
    /// # Returns
    /// A receipt describing what was uploaded.
    ///
    /// # Errors
    /// Returns an `UploadError`; nothing is retried.
    pub async fn upload(
        &self,
        payload: &ResolvedPayload,
        target: &UploadTarget,
    ) -> Result<UploadReceipt, UploadError> {
        let path: &Path = &payload.final_path;
        let size: u64 = tokio::fs::metadata(path)
            .await
            .map_err(|source| UploadError::PayloadUnreadable {
                path: path.display().to_string(),
                source,
            })?
            .len();

        let metadata: ObjectMetadata = payload_metadata(payload);
        let strategy: UploadStrategy = upload_strategy(size, self.options.multipart_threshold);
        tracing::info!(
            path = %path.display(),
            bucket = %target.bucket,
            key = %target.object_key,
            size,
            strategy = ?strategy,
            "Starting upload"
        );

        let receipt: UploadReceipt = match strategy {
            UploadStrategy::SinglePut => self.upload_single(path, size, &metadata, target).await?,
            UploadStrategy::Multipart => {
                self.upload_multipart(path, size, &metadata, target).await?
            }
        };

        tracing::info!(
            bucket = %receipt.bucket,
            key = %receipt.key,
            bytes = receipt.bytes,
            parts = receipt.part_count,
            strategy = ?receipt.strategy,
            "Upload complete"
        );
        Ok(receipt)
    }

    /// Upload the whole file in one request.
    async fn upload_single(
        &self,
        path: &Path,
        size: u64,
        metadata: &ObjectMetadata,
        target: &UploadTarget,
    ) -> Result<UploadReceipt, UploadError> {
        let etag: Option<String> = self
            .with_timeout(
                "PutObject",
                &target.object_key,
                self.client
                    .put_object_from_file(&target.bucket, &target.object_key, path, metadata),
            )
            .await
            .map_err(|source: StorageError| {
                tracing::error!(
                    key = %target.object_key,
                    status = ?source.status(),
                    error = %source,
                    "Single PUT failed"
                );
                UploadError::TransportFailure {
                    key: target.object_key.clone(),
                    source,
                }
            })?;

        Ok(UploadReceipt {
            bucket: target.bucket.clone(),
            key: target.object_key.clone(),
            bytes: size,
            strategy: UploadStrategy::SinglePut,
            part_count: 1,
            etag,
        })
    }

    /// Initiate, upload parts, verify and commit.
    async fn upload_multipart(
        &self,
        path: &Path,
        size: u64,
        metadata: &ObjectMetadata,
        target: &UploadTarget,
    ) -> Result<UploadReceipt, UploadError> {
        let key: &str = &target.object_key;

        // 1. Initiate
        let upload_id: String = match self
            .with_timeout(
                "CreateMultipartUpload",
                key,
                self.client
                    .create_multipart_upload(&target.bucket, key, metadata),
            )
            .await
        {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                tracing::error!(key = %key, "No upload ID returned");
                return Err(UploadError::InitiateFailed {
                    key: key.to_string(),
                    message: "no upload ID in response".to_string(),
                });
            }
            Err(e) => {
                tracing::error!(key = %key, status = ?e.status(), error = %e, "Initiate failed");
                return Err(UploadError::InitiateFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                });
            }
        };

        // 2. Partition
        let parts: Vec<PartInfo> = generate_parts(size, self.options.part_size);
        let total_parts: usize = parts.len();
        let mut session: MultipartSession =
            MultipartSession::new(upload_id.clone(), self.options.part_size, total_parts as u32);
        tracing::info!(
            key = %key,
            upload_id = %session.upload_id(),
            parts = session.total_parts(),
            part_size = session.part_size(),
            "Initiated multipart upload"
        );

        // 3. Upload parts
        let results: Vec<(u32, Option<String>)> =
            self.upload_parts(path, target, &upload_id, parts).await;
        for (part_number, etag) in results {
            if let Some(etag) = etag {
                session.record_part(part_number, etag);
            }
        }

        // 4. Verify
        let manifest: CompletionManifest = match session.into_manifest() {
            Ok(manifest) => manifest,
            Err(missing) => {
                let recorded: usize = total_parts - missing.len();
                tracing::error!(
                    key = %key,
                    upload_id = %upload_id,
                    expected = total_parts,
                    recorded,
                    missing = ?missing,
                    "Multipart upload incomplete, not committing"
                );
                self.abort_quietly(target, &upload_id).await;
                return Err(UploadError::IncompletePartSet {
                    key: key.to_string(),
                    upload_id,
                    expected: total_parts,
                    recorded,
                    missing,
                });
            }
        };

        // 5. Commit
        tracing::debug!(key = %key, manifest = %manifest.to_xml(), "Committing multipart upload");
        let etag: Option<String> = match self
            .with_timeout(
                "CompleteMultipartUpload",
                key,
                self.client
                    .complete_multipart_upload(&target.bucket, key, &upload_id, &manifest),
            )
            .await
        {
            Ok(etag) => etag,
            Err(source) => {
                tracing::error!(
                    key = %key,
                    upload_id = %upload_id,
                    status = ?source.status(),
                    error = %source,
                    "Commit failed"
                );
                self.abort_quietly(target, &upload_id).await;
                return Err(UploadError::CommitFailed {
                    key: key.to_string(),
                    upload_id,
                    source,
                });
            }
        };

        Ok(UploadReceipt {
            bucket: target.bucket.clone(),
            key: key.to_string(),
            bytes: size,
            strategy: UploadStrategy::Multipart,
            part_count: manifest.len(),
            etag,
        })
    }

    /// Upload parts using buffer_unordered; each result is `(part, ETag)`.
    ///
    /// A failed part or one answered without an ETag yields `None`.
    async fn upload_parts(
        &self,
        path: &Path,
        target: &UploadTarget,
        upload_id: &str,
        parts: Vec<PartInfo>,
    ) -> Vec<(u32, Option<String>)> {
        let max_concurrency: usize = self.options.max_concurrency.max(1);

        stream::iter(parts)
            .map(|part: PartInfo| async move {
                let result: Result<Option<String>, StorageError> = self
                    .with_timeout(
                        "UploadPart",
                        &target.object_key,
                        self.client.upload_part_from_file_range(
                            &target.bucket,
                            &target.object_key,
                            upload_id,
                            part.part_number,
                            path,
                            part.offset,
                            part.length,
                        ),
                    )
                    .await;

                let etag: Option<String> = match result {
                    Ok(Some(etag)) if !etag.is_empty() => {
                        tracing::info!(
                            part = part.part_number,
                            offset = part.offset,
                            length = part.length,
                            "Uploaded part"
                        );
                        Some(etag)
                    }
                    Ok(_) => {
                        tracing::error!(part = part.part_number, "Part uploaded without ETag");
                        None
                    }
                    Err(e) => {
                        tracing::error!(
                            part = part.part_number,
                            status = ?e.status(),
                            error = %e,
                            "Part upload failed"
                        );
                        None
                    }
                };
                (part.part_number, etag)
            })
            .buffer_unordered(max_concurrency)
            .collect()
            .await
    }

    /// Abort a session, logging instead of failing.
    async fn abort_quietly(&self, target: &UploadTarget, upload_id: &str) {
        let result: Result<(), StorageError> = self
            .with_timeout(
                "AbortMultipartUpload",
                &target.object_key,
                self.client
                    .abort_multipart_upload(&target.bucket, &target.object_key, upload_id),
            )
            .await;
        match result {
            Ok(()) => tracing::info!(upload_id = %upload_id, "Aborted multipart upload"),
            Err(e) => tracing::warn!(upload_id = %upload_id, error = %e, "Abort failed"),
        }
    }

    /// Bound a request by the configured timeout.
    async fn with_timeout<T, F>(
        &self,
        operation: &'static str,
        key: &str,
        request: F,
    ) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.options.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                operation,
                key: key.to_string(),
                seconds: self.options.request_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;

    use scriptbox_common::NamingStrategy;
    use tempfile::TempDir;

    use crate::memory::MemoryStorageClient;
    use crate::types::{S3Credentials, StorageSettings};

    const MIB: u64 = 1024 * 1024;

    /// Payload backed by a sparse file of `size` bytes.
    fn sparse_payload(dir: &TempDir, size: u64) -> ResolvedPayload {
        let final_path: PathBuf = dir.path().join("abc123.mkv");
        File::create(&final_path).unwrap().set_len(size).unwrap();
        ResolvedPayload {
            source_path: final_path.clone(),
            final_path,
            hash: "abc123".to_string(),
            catalog_id: "4567".to_string(),
            extension: ".mkv".to_string(),
            category: "movies".to_string(),
            size,
            original_directory: dir.path().to_path_buf(),
            working_directory: dir.path().to_path_buf(),
            cleanup_directory: dir.path().to_path_buf(),
            naming_strategy: NamingStrategy::Primary,
            copy_strategy: None,
        }
    }

    fn target_for(payload: &ResolvedPayload) -> UploadTarget {
        let settings: StorageSettings =
            StorageSettings::new("http://localhost:9000", S3Credentials::new("a", "b"));
        UploadTarget::for_payload("media", payload, &settings)
    }

    #[test]
    fn test_upload_options_default() {
        let options: UploadOptions = UploadOptions::default();
        assert_eq!(options.multipart_threshold, MULTIPART_THRESHOLD);
        assert_eq!(options.part_size, MULTIPART_THRESHOLD);
        assert_eq!(options.max_concurrency, MAX_PART_CONCURRENCY);
        assert_eq!(options.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_upload_options_builders() {
        let options: UploadOptions = UploadOptions::new()
            .with_chunk_size(8)
            .with_max_concurrency(2)
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(options.multipart_threshold, 8);
        assert_eq!(options.part_size, 8);
        assert_eq!(options.max_concurrency, 2);
        assert_eq!(options.request_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_single_put_below_threshold() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, MULTIPART_THRESHOLD - 1);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new();

        let receipt: UploadReceipt = UploadOrchestrator::new(&client)
            .upload(&payload, &target)
            .await
            .unwrap();

        assert_eq!(receipt.strategy, UploadStrategy::SinglePut);
        assert_eq!(receipt.part_count, 1);
        assert_eq!(receipt.key, "Media/Movies/abc123.mkv");
        let puts = client.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].metadata.get("hash").map(String::as_str), Some("abc123"));
        assert_eq!(puts[0].metadata.get("catalog-id").map(String::as_str), Some("4567"));
        assert!(client.initiated().is_empty());
    }

    #[tokio::test]
    async fn test_exact_threshold_is_multipart() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, MULTIPART_THRESHOLD);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new();

        let receipt: UploadReceipt = UploadOrchestrator::new(&client)
            .upload(&payload, &target)
            .await
            .unwrap();

        assert_eq!(receipt.strategy, UploadStrategy::Multipart);
        assert_eq!(receipt.part_count, 1);
        assert!(client.puts().is_empty());
        assert_eq!(client.initiated().len(), 1);
        assert_eq!(
            client.initiated()[0].metadata.get("hash").map(String::as_str),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn test_multipart_200_mib_commits_sorted_manifest() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 200 * MIB);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_reverse_completion();

        let receipt: UploadReceipt = UploadOrchestrator::new(&client)
            .upload(&payload, &target)
            .await
            .unwrap();

        assert_eq!(receipt.part_count, 4);
        assert_eq!(receipt.bytes, 200 * MIB);

        let mut parts = client.parts();
        assert_eq!(parts.len(), 4);
        // Parts finished in reverse order
        assert_eq!(parts.first().map(|p| p.part_number), Some(4));
        parts.sort_by_key(|p| p.part_number);
        assert_eq!(parts[3].offset, 192 * MIB);
        assert_eq!(parts[3].length, 8 * MIB);

        let completed = client.completed();
        assert_eq!(completed.len(), 1);
        assert_eq!(
            completed[0]
                .manifest
                .parts()
                .iter()
                .map(|p| p.part_number)
                .collect::<Vec<u32>>(),
            vec![1, 2, 3, 4]
        );
        assert!(client.aborted().is_empty());
    }

    #[tokio::test]
    async fn test_part_concurrency_is_bounded() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 12 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient =
            MemoryStorageClient::new().with_part_delay(Duration::from_millis(20));

        UploadOrchestrator::new(&client)
            .with_options(UploadOptions::new().with_chunk_size(1024))
            .upload(&payload, &target)
            .await
            .unwrap();

        assert_eq!(client.parts().len(), 12);
        assert_eq!(client.max_parts_in_flight(), MAX_PART_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_missing_etag_skips_commit() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 4 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_missing_etag(3);

        let result = UploadOrchestrator::new(&client)
            .with_options(UploadOptions::new().with_chunk_size(1024))
            .upload(&payload, &target)
            .await;

        match result {
            Err(UploadError::IncompletePartSet { expected, recorded, missing, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(recorded, 3);
                assert_eq!(missing, vec![3]);
            }
            other => panic!("expected IncompletePartSet, got {:?}", other),
        }
        assert_eq!(client.parts().len(), 4);
        assert!(client.completed().is_empty());
        assert_eq!(client.aborted().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_part_skips_commit() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 3 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_failing_part(1);

        let result = UploadOrchestrator::new(&client)
            .with_options(UploadOptions::new().with_chunk_size(1024))
            .upload(&payload, &target)
            .await;

        assert!(matches!(result, Err(UploadError::IncompletePartSet { .. })));
        assert!(client.completed().is_empty());
    }

    #[tokio::test]
    async fn test_hung_part_times_out() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 2 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_hanging_part(2);

        let result = UploadOrchestrator::new(&client)
            .with_options(
                UploadOptions::new()
                    .with_chunk_size(1024)
                    .with_request_timeout(Duration::from_millis(50)),
            )
            .upload(&payload, &target)
            .await;

        match result {
            Err(UploadError::IncompletePartSet { missing, .. }) => assert_eq!(missing, vec![2]),
            other => panic!("expected IncompletePartSet, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initiate_without_upload_id() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 2 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().without_upload_id();

        let result = UploadOrchestrator::new(&client)
            .with_options(UploadOptions::new().with_chunk_size(1024))
            .upload(&payload, &target)
            .await;

        assert!(matches!(result, Err(UploadError::InitiateFailed { .. })));
        assert!(client.parts().is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_aborts() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 2 * 1024);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_failed_commit();

        let result = UploadOrchestrator::new(&client)
            .with_options(UploadOptions::new().with_chunk_size(1024))
            .upload(&payload, &target)
            .await;

        assert!(matches!(result, Err(UploadError::CommitFailed { .. })));
        assert_eq!(client.aborted().len(), 1);
    }

    #[tokio::test]
    async fn test_single_put_failure_is_transport_failure() {
        let dir: TempDir = TempDir::new().unwrap();
        let payload: ResolvedPayload = sparse_payload(&dir, 10);
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new().with_failed_put();

        let result = UploadOrchestrator::new(&client).upload(&payload, &target).await;

        match result {
            Err(UploadError::TransportFailure { source, .. }) => {
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("expected TransportFailure, got {:?}", other),
        }
        // No automatic retry
        assert_eq!(client.put_attempts(), 1);
    }

    #[tokio::test]
    async fn test_missing_payload_is_unreadable() {
        let dir: TempDir = TempDir::new().unwrap();
        let mut payload: ResolvedPayload = sparse_payload(&dir, 10);
        payload.final_path = dir.path().join("missing.mkv");
        let target: UploadTarget = target_for(&payload);
        let client: MemoryStorageClient = MemoryStorageClient::new();

        let result = UploadOrchestrator::new(&client).upload(&payload, &target).await;

        assert!(matches!(result, Err(UploadError::PayloadUnreadable { .. })));
    }
}
