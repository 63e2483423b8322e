//! Removal of the source directory after a successful upload.

use std::path::Path;

use crate::error::CleanupWarning;

/// Recursively delete `directory`.
///
/// # Errors
/// Returns a `CleanupWarning`; callers log it and carry on.
pub fn cleanup(directory: &Path) -> Result<(), CleanupWarning> {
    std::fs::remove_dir_all(directory).map_err(|source| CleanupWarning {
        directory: directory.display().to_string(),
        source,
    })?;
    tracing::info!(directory = %directory.display(), "Removed source directory");
    Ok(())
}
