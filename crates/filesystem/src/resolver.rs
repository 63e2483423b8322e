//! Payload resolution for a completed download.
//!
//! Resolution runs these steps in order:
//!
//! 1. A completion directory named like `abc123--[[4567]]` is renamed to its
//!    sibling `abc123` before anything else happens.
//! 2. The largest non-hidden regular file under the directory is selected.
//! 3. Hash, catalog ID and extension are derived by the naming chain.
//! 4. The payload is copied to `<directory>/<hash><extension>`.

use std::fs;
use std::path::{Path, PathBuf};

use scriptbox_common::{
    base_name, parse_naming, split_extension, NamingInput, NamingStrategy, NamingToken,
    ParsedName, DEFAULT_CATEGORY,
};

use crate::copy::{copy_payload, CopyStrategy};
use crate::error::ResolutionError;
use crate::scanner::{find_largest_payload, PayloadCandidate};

/// A finished download as reported by the download manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Absolute path of the completion directory.
    pub completion_directory: PathBuf,
    /// Nominal final name (bare name or full path).
    pub final_name: String,
    /// Category used as an object key segment.
    pub category: String,
}

impl CompletionEvent {
    /// Create an event with the default category.
    pub fn new(completion_directory: impl Into<PathBuf>, final_name: impl Into<String>) -> Self {
        Self {
            completion_directory: completion_directory.into(),
            final_name: final_name.into(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// The single file to upload and the metadata describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayload {
    /// File selected as the payload.
    pub source_path: PathBuf,
    /// `<working_directory>/<hash><extension>`, the file that gets uploaded.
    pub final_path: PathBuf,
    /// Content hash from the naming token.
    pub hash: String,
    /// External catalog ID from the naming token.
    pub catalog_id: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    /// Category carried over from the event.
    pub category: String,
    /// Size of the payload in bytes.
    pub size: u64,
    /// Completion directory as reported by the download manager.
    pub original_directory: PathBuf,
    /// Directory after the optional rename.
    pub working_directory: PathBuf,
    /// Directory removed after a successful upload.
    pub cleanup_directory: PathBuf,
    /// Naming strategy that produced hash and catalog ID.
    pub naming_strategy: NamingStrategy,
    /// How the final file was produced, `None` if the payload already had its final name.
    pub copy_strategy: Option<CopyStrategy>,
}

impl ResolvedPayload {
    /// `<hash><extension>`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.hash, self.extension)
    }
}

/// Resolves completion events into payloads. Purely filesystem-bound.
#[derive(Debug, Clone, Default)]
pub struct PayloadResolver;

impl PayloadResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve a completion event into an uploadable payload.
    ///
    /// # Arguments
    /// * `event` - The completion event to resolve
    ///
    /// # Errors
    /// Returns a `ResolutionError` for rename, discovery, naming or copy failures.
    pub fn resolve(&self, event: &CompletionEvent) -> Result<ResolvedPayload, ResolutionError> {
        let original_directory: PathBuf = event.completion_directory.clone();
        let directory_name: String = base_name(&original_directory)?.to_string();

        // 1. Normalise a token-named directory to its bare hash
        let working_directory: PathBuf =
            self.normalize_directory(&original_directory, &directory_name)?;

        // 2. Select the payload
        let payload: PayloadCandidate = find_largest_payload(&working_directory)?;
        let payload_name: String = base_name(&payload.path)?.to_string();
        tracing::info!(
            path = %payload.path.display(),
            size = payload.size,
            "Selected payload"
        );

        // 3. Derive naming metadata
        let parsed: ParsedName = parse_naming(&NamingInput {
            final_name: &event.final_name,
            directory_name: &directory_name,
            payload_name: &payload_name,
        })
        .map_err(|source| {
            tracing::error!(
                final_name = %event.final_name,
                directory = %working_directory.display(),
                expected = source.expected,
                "No naming strategy matched"
            );
            ResolutionError::NamingMismatch {
                directory: working_directory.display().to_string(),
                source,
            }
        })?;
        let token: NamingToken = parsed.token;

        // 4. Extension from the token, else from the payload file name
        let extension: String = match token.extension {
            Some(ref ext) => ext.clone(),
            None => split_extension(&payload_name).1.unwrap_or("").to_string(),
        };
        tracing::info!(
            hash = %token.hash,
            catalog_id = %token.catalog_id,
            extension = %extension,
            strategy = parsed.strategy.name(),
            "Derived naming metadata"
        );

        // 5. Copy to the final name
        let final_path: PathBuf = working_directory.join(format!("{}{}", token.hash, extension));
        let copy_strategy: Option<CopyStrategy> = if payload.path == final_path {
            tracing::info!(path = %final_path.display(), "Payload already has its final name");
            None
        } else {
            let strategy: CopyStrategy = copy_payload(&payload.path, &final_path)?;
            tracing::info!(
                from = %payload.path.display(),
                to = %final_path.display(),
                strategy = ?strategy,
                "Copied payload"
            );
            Some(strategy)
        };

        Ok(ResolvedPayload {
            source_path: payload.path,
            final_path,
            hash: token.hash,
            catalog_id: token.catalog_id,
            extension,
            category: event.category.clone(),
            size: payload.size,
            original_directory,
            cleanup_directory: working_directory.clone(),
            working_directory,
            naming_strategy: parsed.strategy,
            copy_strategy,
        })
    }

    /// Rename `<parent>/<hash>--[[id]]` to `<parent>/<hash>`; other names are kept.
    fn normalize_directory(
        &self,
        directory: &Path,
        directory_name: &str,
    ) -> Result<PathBuf, ResolutionError> {
        let token: NamingToken = match NamingToken::parse(directory_name) {
            Some(token) => token,
            None => return Ok(directory.to_path_buf()),
        };

        let target: PathBuf = match directory.parent() {
            Some(parent) => parent.join(&token.hash),
            None => PathBuf::from(&token.hash),
        };

        fs::rename(directory, &target).map_err(|source| {
            tracing::error!(
                from = %directory.display(),
                to = %target.display(),
                error = %source,
                "Directory rename failed"
            );
            ResolutionError::DirectoryRenameFailed {
                from: directory.display().to_string(),
                to: target.display().to_string(),
                source,
            }
        })?;

        tracing::info!(
            from = %directory.display(),
            to = %target.display(),
            "Renamed completion directory"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, size: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    #[test]
    fn test_resolve_with_primary_name() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("Some.Movie.2019");
        write_file(&download.join("Some.Movie.2019.mkv"), 500);
        write_file(&download.join("info.nfo"), 10);
        write_file(&download.join("sample.mkv"), 3);

        let event: CompletionEvent = CompletionEvent::new(&download, "abc123--[[4567]].mkv");
        let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).unwrap();

        assert_eq!(payload.source_path, download.join("Some.Movie.2019.mkv"));
        assert_eq!(payload.final_path, download.join("abc123.mkv"));
        assert_eq!(payload.hash, "abc123");
        assert_eq!(payload.catalog_id, "4567");
        assert_eq!(payload.extension, ".mkv");
        assert_eq!(payload.category, "movies");
        assert_eq!(payload.size, 500);
        assert_eq!(payload.naming_strategy, NamingStrategy::Primary);
        assert_eq!(payload.copy_strategy, Some(CopyStrategy::Direct));
        assert_eq!(payload.cleanup_directory, download);
        assert_eq!(fs::metadata(&payload.final_path).unwrap().len(), 500);
        assert!(payload.source_path.exists());
    }

    #[test]
    fn test_resolve_renames_token_directory_first() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("abc123--[[4567]]");
        write_file(&download.join("movie.mkv"), 64);

        let event: CompletionEvent = CompletionEvent::new(&download, "abc123--[[4567]]");
        let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).unwrap();

        let renamed: PathBuf = root.path().join("abc123");
        assert!(!download.exists());
        assert!(renamed.is_dir());
        assert_eq!(payload.original_directory, download);
        assert_eq!(payload.working_directory, renamed);
        assert_eq!(payload.cleanup_directory, renamed);
        assert_eq!(payload.source_path, renamed.join("movie.mkv"));
        // Extension comes from the payload when the final name has none
        assert_eq!(payload.final_path, renamed.join("abc123.mkv"));
    }

    #[test]
    fn test_resolve_rename_conflict_fails() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("abc123--[[4567]]");
        write_file(&download.join("movie.mkv"), 64);
        write_file(&root.path().join("abc123/occupied.txt"), 1);

        let event: CompletionEvent = CompletionEvent::new(&download, "abc123--[[4567]].mkv");
        let result = PayloadResolver::new().resolve(&event);

        assert!(matches!(
            result,
            Err(ResolutionError::DirectoryRenameFailed { .. })
        ));
        assert!(download.exists());
    }

    #[test]
    fn test_resolve_skips_copy_when_already_named() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("abc123");
        write_file(&download.join("abc123.mkv"), 128);

        let event: CompletionEvent =
            CompletionEvent::new(&download, "abc123--[[4567]].mkv").with_category("series");
        let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).unwrap();

        assert_eq!(payload.source_path, payload.final_path);
        assert_eq!(payload.copy_strategy, None);
        assert_eq!(payload.category, "series");
    }

    #[test]
    fn test_resolve_naming_from_directory_token() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("abc123--[[4567]]");
        write_file(&download.join("movie.mkv"), 64);

        let event: CompletionEvent = CompletionEvent::new(&download, "Some Movie (2019)");
        let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).unwrap();

        let renamed: PathBuf = root.path().join("abc123");
        assert_eq!(payload.naming_strategy, NamingStrategy::DirectoryToken);
        assert_eq!(payload.hash, "abc123");
        assert_eq!(payload.catalog_id, "4567");
        assert_eq!(payload.extension, ".mkv");
        assert_eq!(payload.final_path, renamed.join("abc123.mkv"));
        assert!(payload.final_path.exists());
    }

    #[test]
    fn test_resolve_directory_fallback() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("deadbeef Some Movie");
        write_file(&download.join("Some.Movie.603.1080p.mp4"), 256);

        let event: CompletionEvent = CompletionEvent::new(&download, "Some Movie (2019)");
        let payload: ResolvedPayload = PayloadResolver::new().resolve(&event).unwrap();

        assert_eq!(payload.naming_strategy, NamingStrategy::DirectoryFallback);
        assert_eq!(payload.hash, "deadbeef");
        assert_eq!(payload.catalog_id, "603");
        assert_eq!(payload.final_path, download.join("deadbeef.mp4"));
    }

    #[test]
    fn test_resolve_naming_mismatch_leaves_download_in_place() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("Some Movie");
        write_file(&download.join("movie.mkv"), 256);

        let event: CompletionEvent = CompletionEvent::new(&download, "Some Movie");
        let result = PayloadResolver::new().resolve(&event);

        assert!(matches!(result, Err(ResolutionError::NamingMismatch { .. })));
        assert!(download.join("movie.mkv").exists());
        assert_eq!(fs::read_dir(&download).unwrap().count(), 1);
    }

    #[test]
    fn test_resolve_no_payload() {
        let root: TempDir = TempDir::new().unwrap();
        let download: PathBuf = root.path().join("empty");
        fs::create_dir_all(&download).unwrap();
        write_file(&download.join(".hidden"), 10);

        let event: CompletionEvent = CompletionEvent::new(&download, "abc123--[[4567]].mkv");
        let result = PayloadResolver::new().resolve(&event);

        assert!(matches!(result, Err(ResolutionError::NoPayloadFound { .. })));
    }
}
