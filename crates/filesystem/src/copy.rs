//! Copying the payload to its final name.
//!
//! The payload is copied rather than moved so the source stays in place until
//! the whole directory is removed after a successful upload. A failed direct
//! copy is retried once by copying the payload's containing directory tree
//! into a hidden staging directory and renaming the staged payload into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ResolutionError;

/// Which copy method produced the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Single file copy.
    Direct,
    /// Recursive copy of the containing directory, then rename.
    DirectoryTree,
}

/// Copy `source` to `destination`, retrying once with a directory-tree copy.
///
/// # Errors
/// Returns `ResolutionError::CopyFailed` if both strategies fail.
pub fn copy_payload(source: &Path, destination: &Path) -> Result<CopyStrategy, ResolutionError> {
    copy_payload_with(source, destination, |from: &Path, to: &Path| {
        fs::copy(from, to).map(|_| ())
    })
}

/// `copy_payload` with the direct copy step supplied by the caller.
fn copy_payload_with<F>(
    source: &Path,
    destination: &Path,
    direct: F,
) -> Result<CopyStrategy, ResolutionError>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let first: io::Error = match direct(source, destination) {
        Ok(_) => return Ok(CopyStrategy::Direct),
        Err(e) => e,
    };

    tracing::warn!(
        source = %source.display(),
        destination = %destination.display(),
        error = %first,
        "Direct copy failed, retrying with directory-tree copy"
    );

    copy_via_directory_tree(source, destination)
        .map(|_| CopyStrategy::DirectoryTree)
        .map_err(|second: io::Error| ResolutionError::CopyFailed {
            from: source.display().to_string(),
            to: destination.display().to_string(),
            message: format!("direct copy: {}; directory-tree copy: {}", first, second),
        })
}

/// Staging directory used by the directory-tree strategy.
fn staging_dir_for(destination: &Path) -> io::Result<PathBuf> {
    let parent: &Path = destination.parent().ok_or_else(|| no_parent(destination))?;
    let name: String = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| no_parent(destination))?;
    Ok(parent.join(format!(".{}.staging", name)))
}

fn copy_via_directory_tree(source: &Path, destination: &Path) -> io::Result<()> {
    let source_dir: &Path = source.parent().ok_or_else(|| no_parent(source))?;
    let relative: &Path = source
        .strip_prefix(source_dir)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let staging: PathBuf = staging_dir_for(destination)?;

    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    let result: io::Result<()> = copy_tree(source_dir, &staging)
        .and_then(|_| fs::rename(staging.join(relative), destination));

    if let Err(e) = fs::remove_dir_all(&staging) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staging directory {}: {}", staging.display(), e);
        }
    }

    result
}

/// Recursively copy `from` into `to`, skipping `to` itself if it is nested.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;

    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e: &walkdir::DirEntry| e.path() != to);

    for entry in walker {
        let entry: walkdir::DirEntry = entry.map_err(io::Error::from)?;
        let relative: &Path = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target: PathBuf = to.join(relative);
        let file_type: fs::FileType = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

fn no_parent(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} has no parent directory", path.display()),
    )
}
