//! File system operations for the ScriptBox post-processor.
//!
//! This crate turns a completed download into a single named payload:
//! - `find_largest_payload()` - Largest non-hidden regular file under a directory
//! - `PayloadResolver` - Directory normalisation, naming, and payload copy
//! - `copy_payload()` - Direct copy with a directory-tree fallback
//! - `cleanup()` - Best-effort removal of the source directory

pub mod cleanup;
pub mod copy;
pub mod error;
pub mod resolver;
pub mod scanner;

// Re-export main types
pub use cleanup::cleanup;
pub use copy::{copy_payload, CopyStrategy};
pub use error::{CleanupWarning, ResolutionError};
pub use resolver::{CompletionEvent, PayloadResolver, ResolvedPayload};
pub use scanner::{find_largest_payload, select_largest, PayloadCandidate};
