//! AWS SDK S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;

use scriptbox_storage::{
    CompletionManifest, ObjectMetadata, StorageClient, StorageError, StorageSettings,
};

use crate::error::S3BackendError;

/// StorageClient implementation using AWS SDK for Rust.
///
/// Requests are signed with SigV4 using static credentials and sent to the
/// configured endpoint with path-style addressing.
pub struct S3StorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
}

impl S3StorageClient {
    /// Create a new S3 storage client.
    ///
    /// # Arguments
    /// * `settings` - Endpoint, region, credentials and request timeout
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfig` if the endpoint or credentials are unusable.
    pub async fn new(settings: &StorageSettings) -> Result<Self, StorageError> {
        validate_settings(settings)?;

        let credentials: Credentials = Credentials::new(
            &settings.credentials.access_key_id,
            &settings.credentials.secret_access_key,
            None,
            None,
            "scriptbox",
        );
        let timeouts: TimeoutConfig = TimeoutConfig::builder()
            .operation_attempt_timeout(settings.request_timeout)
            .build();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(settings.endpoint.clone())
            .force_path_style(true)
            .build();

        tracing::debug!(
            endpoint = %settings.endpoint,
            region = %settings.region,
            "Created S3 client"
        );

        Ok(Self {
            s3_client: S3Client::from_conf(s3_config),
        })
    }
}

fn validate_settings(settings: &StorageSettings) -> Result<(), S3BackendError> {
    if !(settings.endpoint.starts_with("https://") || settings.endpoint.starts_with("http://")) {
        return Err(S3BackendError::InvalidEndpoint(settings.endpoint.clone()));
    }
    if settings.credentials.access_key_id.is_empty()
        || settings.credentials.secret_access_key.is_empty()
    {
        return Err(S3BackendError::ConfigError(
            "access key and secret key must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Convert an SDK failure into a `StorageError` carrying the HTTP status.
fn request_error<E>(
    operation: &'static str,
    bucket: &str,
    key: &str,
    err: SdkError<E, HttpResponse>,
) -> StorageError
where
    E: std::error::Error + 'static,
{
    let status: Option<u16> = err.raw_response().map(|r| r.status().as_u16());
    StorageError::RequestFailed {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        status,
        message: DisplayErrorContext(&err).to_string(),
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError> {
        let body = ByteStream::from_path(file_path)
            .await
            .map_err(|e| StorageError::IoError {
                path: file_path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut request = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body);

        for (k, v) in metadata {
            request = request.metadata(k, v);
        }

        let output = request
            .send()
            .await
            .map_err(|err| request_error("PutObject", bucket, key, err))?;

        Ok(output.e_tag().map(|s| s.to_string()))
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<Option<String>, StorageError> {
        let mut request = self
            .s3_client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key);

        for (k, v) in metadata {
            request = request.metadata(k, v);
        }

        let output = request
            .send()
            .await
            .map_err(|err| request_error("CreateMultipartUpload", bucket, key, err))?;

        Ok(output.upload_id().map(|s| s.to_string()))
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
        // Stream the range straight from disk
        let body = ByteStream::read_from()
            .path(file_path)
            .offset(offset)
            .length(Length::Exact(length))
            .build()
            .await
            .map_err(|e| StorageError::IoError {
                path: file_path.display().to_string(),
                message: e.to_string(),
            })?;

        let output = self
            .s3_client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .content_length(length as i64)
            .body(body)
            .send()
            .await
            .map_err(|err| request_error("UploadPart", bucket, key, err))?;

        Ok(output.e_tag().map(|s| s.to_string()))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        manifest: &CompletionManifest,
    ) -> Result<Option<String>, StorageError> {
        let parts: Vec<CompletedPart> = manifest
            .parts()
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number as i32)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let output = self
            .s3_client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| request_error("CompleteMultipartUpload", bucket, key, err))?;

        Ok(output.e_tag().map(|s| s.to_string()))
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.s3_client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| request_error("AbortMultipartUpload", bucket, key, err))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbox_storage::S3Credentials;

    #[test]
    fn test_s3_client_implements_storage_client() {
        // This is a compile-time test to ensure the trait is implemented correctly
        fn assert_storage_client<T: StorageClient>() {}
        assert_storage_client::<S3StorageClient>();
    }

    #[test]
    fn test_validate_settings_rejects_bare_host() {
        let settings: StorageSettings =
            StorageSettings::new("s3.example.com", S3Credentials::new("a", "b"));
        assert!(matches!(
            validate_settings(&settings),
            Err(S3BackendError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_validate_settings_rejects_empty_credentials() {
        let settings: StorageSettings =
            StorageSettings::new("https://s3.example.com", S3Credentials::new("", "b"));
        assert!(matches!(
            validate_settings(&settings),
            Err(S3BackendError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_new_builds_client() {
        let settings: StorageSettings =
            StorageSettings::new("http://localhost:9000", S3Credentials::new("a", "b"));
        assert!(S3StorageClient::new(&settings).await.is_ok());
    }
}
