//! Payload discovery inside a completion directory.

use std::path::{Path, PathBuf};

use scriptbox_common::is_hidden;
use walkdir::WalkDir;

use crate::error::ResolutionError;

/// A regular file that could be the payload of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadCandidate {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

/// Pick the largest candidate. Ties keep the first one seen.
pub fn select_largest<I>(candidates: I) -> Option<PayloadCandidate>
where
    I: IntoIterator<Item = PayloadCandidate>,
{
    let mut best: Option<PayloadCandidate> = None;
    for candidate in candidates {
        let is_larger: bool = best
            .as_ref()
            .map_or(true, |b: &PayloadCandidate| candidate.size > b.size);
        if is_larger {
            best = Some(candidate);
        }
    }
    best
}

/// Find the largest non-hidden regular file under `root`.
///
/// The tree is walked recursively without following symlinks, skipping
/// dot-files and dot-directories. If the walk yields nothing, a flat listing
/// of `root` is tried before giving up.
///
/// # Errors
/// Returns `ResolutionError::NoPayloadFound` when neither scan finds a file.
pub fn find_largest_payload(root: &Path) -> Result<PayloadCandidate, ResolutionError> {
    let walked: Vec<PayloadCandidate> = walk_candidates(root);
    tracing::debug!(root = %root.display(), candidates = walked.len(), "Recursive payload scan");

    let candidates: Vec<PayloadCandidate> = if walked.is_empty() {
        tracing::warn!(
            root = %root.display(),
            "Recursive scan found no files, falling back to top-level listing"
        );
        flat_candidates(root)
    } else {
        walked
    };

    select_largest(candidates).ok_or_else(|| ResolutionError::NoPayloadFound {
        directory: root.display().to_string(),
    })
}

/// Recursive walk, skipping unreadable entries.
fn walk_candidates(root: &Path) -> Vec<PayloadCandidate> {
    let mut candidates: Vec<PayloadCandidate> = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e: &walkdir::DirEntry| {
            e.depth() == 0 || !e.file_name().to_str().map_or(false, is_hidden)
        });

    for entry in walker {
        let entry: walkdir::DirEntry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(meta) => candidates.push(PayloadCandidate {
                path: entry.path().to_path_buf(),
                size: meta.len(),
            }),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.path().display(), e);
            }
        }
    }

    candidates
}

/// Non-recursive listing of regular, non-hidden files in `root`.
fn flat_candidates(root: &Path) -> Vec<PayloadCandidate> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_str().map_or(false, is_hidden))
        .filter_map(|entry| {
            let meta: std::fs::Metadata = entry.metadata().ok()?;
            meta.is_file().then(|| PayloadCandidate {
                path: entry.path(),
                size: meta.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(path: &Path, size: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    fn candidate(name: &str, size: u64) -> PayloadCandidate {
        PayloadCandidate {
            path: PathBuf::from(name),
            size,
        }
    }

    #[test]
    fn test_select_largest_ignores_order() {
        let orders: [[u64; 3]; 3] = [[10, 500, 3], [500, 3, 10], [3, 10, 500]];
        for order in orders {
            let picked: PayloadCandidate =
                select_largest(order.iter().map(|s: &u64| candidate(&s.to_string(), *s))).unwrap();
            assert_eq!(picked.size, 500);
        }
    }

    #[test]
    fn test_select_largest_tie_keeps_first() {
        let picked: PayloadCandidate =
            select_largest(vec![candidate("a", 7), candidate("b", 7), candidate("c", 1)]).unwrap();
        assert_eq!(picked.path, PathBuf::from("a"));
    }

    #[test]
    fn test_select_largest_empty() {
        assert!(select_largest(Vec::new()).is_none());
    }

    #[test]
    fn test_find_largest_payload_recursive() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(&dir.path().join("small.nfo"), 10);
        write_file(&dir.path().join("nested/deeper/movie.mkv"), 500);
        write_file(&dir.path().join("sample/sample.mkv"), 3);

        let picked: PayloadCandidate = find_largest_payload(dir.path()).unwrap();
        assert_eq!(picked.path, dir.path().join("nested/deeper/movie.mkv"));
        assert_eq!(picked.size, 500);
    }

    #[test]
    fn test_find_largest_payload_skips_hidden() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(&dir.path().join(".partial"), 1000);
        write_file(&dir.path().join(".cache/blob"), 2000);
        write_file(&dir.path().join("movie.mkv"), 100);

        let picked: PayloadCandidate = find_largest_payload(dir.path()).unwrap();
        assert_eq!(picked.path, dir.path().join("movie.mkv"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_largest_payload_ignores_symlinks() {
        let dir: TempDir = TempDir::new().unwrap();
        let outside: TempDir = TempDir::new().unwrap();
        write_file(&outside.path().join("huge.bin"), 4096);
        write_file(&dir.path().join("movie.mkv"), 16);
        std::os::unix::fs::symlink(outside.path().join("huge.bin"), dir.path().join("link.bin"))
            .unwrap();

        let picked: PayloadCandidate = find_largest_payload(dir.path()).unwrap();
        assert_eq!(picked.path, dir.path().join("movie.mkv"));
    }

    #[test]
    fn test_find_largest_payload_empty_directory() {
        let dir: TempDir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty-subdir")).unwrap();

        let result = find_largest_payload(dir.path());
        assert!(matches!(result, Err(ResolutionError::NoPayloadFound { .. })));
    }

    #[test]
    fn test_find_largest_payload_missing_directory() {
        let dir: TempDir = TempDir::new().unwrap();
        let result = find_largest_payload(&dir.path().join("gone"));
        assert!(matches!(result, Err(ResolutionError::NoPayloadFound { .. })));
    }

    #[test]
    fn test_flat_candidates_top_level_only() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(&dir.path().join("top.mkv"), 5);
        write_file(&dir.path().join("sub/inner.mkv"), 50);
        write_file(&dir.path().join(".hidden"), 500);

        let flat: Vec<PayloadCandidate> = flat_candidates(dir.path());
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].path, dir.path().join("top.mkv"));
    }
}
