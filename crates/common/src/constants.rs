//! Shared constants used across ScriptBox crates.

use std::time::Duration;

/// Size threshold for multipart uploads and the size of each part (64MiB).
/// Files of exactly this size or larger use the multipart protocol.
pub const MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Maximum number of part uploads in flight for one multipart session.
pub const MAX_PART_CONCURRENCY: usize = 5;

/// Default bound on a single object store request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Category used when the download manager does not supply one.
pub const DEFAULT_CATEGORY: &str = "movies";

/// Region used for request signing when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Top-level prefix for every uploaded object key.
pub const MEDIA_ROOT_PREFIX: &str = "Media";

/// Object metadata key carrying the content hash.
pub const METADATA_KEY_HASH: &str = "hash";

/// Object metadata key carrying the external catalog ID.
pub const METADATA_KEY_CATALOG_ID: &str = "catalog-id";
