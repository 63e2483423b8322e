//! Shared data structures for storage operations.

use std::fmt;
use std::time::Duration;

use scriptbox_common::{
    capitalize_first, DEFAULT_REGION, DEFAULT_REQUEST_TIMEOUT, MEDIA_ROOT_PREFIX,
};
use scriptbox_filesystem::ResolvedPayload;

use crate::parts::UploadStrategy;

/// Static credentials used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Configuration settings for the object store connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Endpoint URL of the S3-compatible API.
    pub endpoint: String,
    /// Region used in the signing scope.
    pub region: String,
    /// Signing credentials.
    pub credentials: S3Credentials,
    /// Upper bound for any single request.
    pub request_timeout: Duration,
}

impl StorageSettings {
    /// Create settings with the default region and request timeout.
    pub fn new(endpoint: impl Into<String>, credentials: S3Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: DEFAULT_REGION.to_string(),
            credentials,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Object key for a payload: `Media/<Category>/<file_name>`.
///
/// Only the first character of the category is upper-cased.
pub fn media_object_key(category: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        MEDIA_ROOT_PREFIX,
        capitalize_first(category),
        file_name
    )
}

/// Where a payload is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Bucket name.
    pub bucket: String,
    /// Full object key.
    pub object_key: String,
    /// Endpoint URL of the S3-compatible API.
    pub endpoint: String,
    /// Region used in the signing scope.
    pub region: String,
    /// Signing credentials.
    pub credentials: S3Credentials,
}

impl UploadTarget {
    /// Derive the target for a resolved payload.
    ///
    /// # Arguments
    /// * `bucket` - Destination bucket
    /// * `payload` - Resolved payload providing category, hash and extension
    /// * `settings` - Connection settings
    pub fn for_payload(
        bucket: impl Into<String>,
        payload: &ResolvedPayload,
        settings: &StorageSettings,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            object_key: media_object_key(&payload.category, &payload.file_name()),
            endpoint: settings.endpoint.clone(),
            region: settings.region.clone(),
            credentials: settings.credentials.clone(),
        }
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    /// Bytes uploaded.
    pub bytes: u64,
    pub strategy: UploadStrategy,
    /// Number of parts (1 for a single PUT).
    pub part_count: usize,
    /// Object ETag reported by the store, if any.
    pub etag: Option<String>,
}
