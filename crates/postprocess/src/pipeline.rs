//! The post-processing run: resolve, upload, clean up.

use scriptbox_filesystem::{cleanup, CleanupWarning, CompletionEvent, PayloadResolver, ResolvedPayload};
use scriptbox_storage::{StorageClient, UploadOrchestrator, UploadReceipt, UploadTarget};

use crate::config::Settings;
use crate::error::PostProcessError;

/// Result of a successful run.
#[derive(Debug)]
pub struct Outcome {
    pub payload: ResolvedPayload,
    pub receipt: UploadReceipt,
    /// Set when the source directory could not be removed.
    pub cleanup_warning: Option<CleanupWarning>,
}

/// Process one completion event.
///
/// Cleanup only runs after a successful upload; a cleanup failure is logged
/// and reported in the outcome, never as an error.
///
/// # Arguments
/// * `settings` - Validated configuration
/// * `client` - Storage backend
///
/// # Errors
/// Returns `PostProcessError::Resolution` or `PostProcessError::Upload`.
pub async fn run<C: StorageClient>(
    settings: &Settings,
    client: &C,
) -> Result<Outcome, PostProcessError> {
    let event: CompletionEvent = settings.event();
    tracing::info!(
        directory = %event.completion_directory.display(),
        final_name = %event.final_name,
        category = %event.category,
        "Processing completed download"
    );

    let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).map_err(|e| {
        tracing::error!(error = %e, "Payload resolution failed");
        PostProcessError::from(e)
    })?;

    let target: UploadTarget = UploadTarget::for_payload(&settings.bucket, &payload, &settings.storage);
    let receipt: UploadReceipt = UploadOrchestrator::new(client)
        .with_options(settings.upload_options())
        .upload(&payload, &target)
        .await
        .map_err(|e| {
            tracing::error!(key = %target.object_key, error = %e, "Upload failed");
            PostProcessError::from(e)
        })?;

    let cleanup_warning: Option<CleanupWarning> = match cleanup(&payload.cleanup_directory) {
        Ok(()) => None,
        Err(warning) => {
            tracing::warn!(
                directory = %warning.directory,
                error = %warning.source,
                "Could not remove source directory"
            );
            Some(warning)
        }
    };

    Ok(Outcome {
        payload,
        receipt,
        cleanup_warning,
    })
}
