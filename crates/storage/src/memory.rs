//! In-memory `StorageClient` that records every request.
//!
//! Nothing is stored; each call is logged so tests can assert on what the
//! orchestrator sent. Faults are injected with the `with_*` builders.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::session::CompletionManifest;
use crate::traits::{ObjectMetadata, StorageClient};

/// A recorded single PUT.
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub file_path: PathBuf,
    pub metadata: ObjectMetadata,
}

/// A recorded multipart initiation.
#[derive(Debug, Clone)]
pub struct InitiateRecord {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub metadata: ObjectMetadata,
}

/// A recorded part upload, in completion order.
#[derive(Debug, Clone)]
pub struct PartRecord {
    pub upload_id: String,
    pub part_number: u32,
    pub offset: u64,
    pub length: u64,
}

/// A recorded commit.
#[derive(Debug, Clone)]
pub struct CompleteRecord {
    pub upload_id: String,
    pub manifest: CompletionManifest,
}

#[derive(Debug, Default)]
struct Faults {
    failed_put: bool,
    no_upload_id: bool,
    missing_etag: HashSet<u32>,
    failing_parts: HashSet<u32>,
    hanging_parts: HashSet<u32>,
    failed_commit: bool,
    reverse_completion: bool,
    part_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Records {
    puts: Vec<PutRecord>,
    initiated: Vec<InitiateRecord>,
    parts: Vec<PartRecord>,
    completed: Vec<CompleteRecord>,
    aborted: Vec<String>,
}

/// Recording storage backend.
#[derive(Debug, Default)]
pub struct MemoryStorageClient {
    faults: Faults,
    records: Mutex<Records>,
    put_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_upload: AtomicUsize,
}

/// Decrements the in-flight counter when a part request ends or is dropped.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every single PUT with HTTP 500.
    pub fn with_failed_put(mut self) -> Self {
        self.faults.failed_put = true;
        self
    }

    /// Answer initiation without an upload ID.
    pub fn without_upload_id(mut self) -> Self {
        self.faults.no_upload_id = true;
        self
    }

    /// Answer the given part successfully but without an ETag.
    pub fn with_missing_etag(mut self, part_number: u32) -> Self {
        self.faults.missing_etag.insert(part_number);
        self
    }

    /// Fail the given part with HTTP 503.
    pub fn with_failing_part(mut self, part_number: u32) -> Self {
        self.faults.failing_parts.insert(part_number);
        self
    }

    /// Never answer the given part.
    pub fn with_hanging_part(mut self, part_number: u32) -> Self {
        self.faults.hanging_parts.insert(part_number);
        self
    }

    /// Fail the commit with HTTP 400.
    pub fn with_failed_commit(mut self) -> Self {
        self.faults.failed_commit = true;
        self
    }

    /// Delay parts so higher part numbers finish first.
    pub fn with_reverse_completion(mut self) -> Self {
        self.faults.reverse_completion = true;
        self
    }

    /// Hold every part request for `delay`.
    pub fn with_part_delay(mut self, delay: Duration) -> Self {
        self.faults.part_delay = Some(delay);
        self
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.records().puts.clone()
    }

    pub fn initiated(&self) -> Vec<InitiateRecord> {
        self.records().initiated.clone()
    }

    pub fn parts(&self) -> Vec<PartRecord> {
        self.records().parts.clone()
    }

    pub fn completed(&self) -> Vec<CompleteRecord> {
        self.records().completed.clone()
    }

    /// Upload IDs of aborted sessions.
    pub fn aborted(&self) -> Vec<String> {
        self.records().aborted.clone()
    }

    /// Number of single PUT requests received, failed ones included.
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of part requests observed at once.
    pub fn max_parts_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn part_delay(&self, part_number: u32) -> Option<Duration> {
        if self.faults.reverse_completion {
            let steps: u64 = 16u64.saturating_sub(u64::from(part_number));
            return Some(Duration::from_millis(10 * steps));
        }
        self.faults.part_delay
    }
}

fn request_failed(operation: &'static str, bucket: &str, key: &str, status: u16) -> StorageError {
    StorageError::RequestFailed {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        status: Some(status),
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if self.faults.failed_put {
            return Err(request_failed("PutObject", bucket, key, 500));
        }
        tokio::fs::metadata(file_path)
            .await
            .map_err(|e| StorageError::IoError {
                path: file_path.display().to_string(),
                message: e.to_string(),
            })?;

        self.records().puts.push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            file_path: file_path.to_path_buf(),
            metadata: metadata.clone(),
        });
        Ok(Some("\"etag-object\"".to_string()))
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError> {
        if self.faults.no_upload_id {
            return Ok(None);
        }
        let upload_id: String = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::SeqCst) + 1);
        self.records().initiated.push(InitiateRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.clone(),
            metadata: metadata.clone(),
        });
        Ok(Some(upload_id))
    }

    async fn upload_part_from_file_range(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        file_path: &Path,
        offset: u64,
        length: u64,
    ) -> Result<Option<String>, StorageError> {
        let current: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard: InFlightGuard<'_> = InFlightGuard {
            counter: &self.in_flight,
        };

        if self.faults.hanging_parts.contains(&part_number) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.part_delay(part_number) {
            tokio::time::sleep(delay).await;
        }
        if self.faults.failing_parts.contains(&part_number) {
            return Err(request_failed("UploadPart", bucket, key, 503));
        }

        let file_len: u64 = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| StorageError::IoError {
                path: file_path.display().to_string(),
                message: e.to_string(),
            })?
            .len();
        if offset + length > file_len {
            return Err(StorageError::IoError {
                path: file_path.display().to_string(),
                message: format!(
                    "range {}..{} exceeds file length {}",
                    offset,
                    offset + length,
                    file_len
                ),
            });
        }

        self.records().parts.push(PartRecord {
            upload_id: upload_id.to_string(),
            part_number,
            offset,
            length,
        });
        if self.faults.missing_etag.contains(&part_number) {
            return Ok(None);
        }
        Ok(Some(format!("\"etag-{}\"", part_number)))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        manifest: &CompletionManifest,
    ) -> Result<Option<String>, StorageError> {
        if self.faults.failed_commit {
            return Err(request_failed("CompleteMultipartUpload", bucket, key, 400));
        }
        self.records().completed.push(CompleteRecord {
            upload_id: upload_id.to_string(),
            manifest: manifest.clone(),
        });
        Ok(Some(format!("\"etag-{}-{}\"", upload_id, manifest.len())))
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.records().aborted.push(upload_id.to_string());
        Ok(())
    }
}
