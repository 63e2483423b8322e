//! Log sinks for the post-processor.
//!
//! Two append-only files receive every run: the info log gets INFO and above,
//! the error log WARN and above. Events are also written to stderr, filtered by
//! `RUST_LOG` (default `info`).

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Open `path` for appending, creating it and its parent directory if needed.
fn open_append(path: &Path) -> Result<File, LoggingError> {
    let open_failed = |source: std::io::Error| LoggingError::OpenFailed {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_failed)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_failed)
}

/// Install the global subscriber.
///
/// # Arguments
/// * `info_log` - File receiving INFO and above
/// * `error_log` - File receiving WARN and above
///
/// # Errors
/// Returns `LoggingError` if a file cannot be opened or a subscriber is already set.
pub fn init_logging(info_log: &Path, error_log: &Path) -> Result<(), LoggingError> {
    let info_file: File = open_append(info_log)?;
    let error_file: File = open_append(error_log)?;

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(info_file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::INFO);
    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(error_file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::WARN);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    tracing_subscriber::registry()
        .with(info_layer)
        .with(error_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}
