//! Post-processing of completed downloads.
//!
//! A completion event is resolved into a single named payload, uploaded to the
//! object store under `Media/<Category>/<hash><ext>`, and the source directory
//! is removed afterwards.
//!
//! - `config` - Command line and environment options validated into `Settings`
//! - `logging` - Info and error log sinks
//! - `pipeline` - Resolve, upload, clean up

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::{normalize_endpoint, CliArgs, ConfigurationError, Settings};
pub use error::PostProcessError;
pub use logging::{init_logging, LoggingError};
pub use pipeline::{run, Outcome};
