//! Runtime configuration.
//!
//! Every option can be given on the command line or through its environment
//! variable. `CliArgs` is the raw parse; `Settings` is the validated form that
//! the rest of the program receives.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use scriptbox_common::{DEFAULT_CATEGORY, DEFAULT_REGION, DEFAULT_REQUEST_TIMEOUT};
use scriptbox_filesystem::CompletionEvent;
use scriptbox_storage::{S3Credentials, StorageSettings, UploadOptions};
use thiserror::Error;

/// Configuration problems detected before any work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required option has no value.
    #[error("Missing required option --{option} (env {env})")]
    Missing {
        option: &'static str,
        env: &'static str,
    },

    /// An option has an unusable value.
    #[error("Invalid value for --{option}: {message}")]
    Invalid {
        option: &'static str,
        message: String,
    },
}

/// Command line arguments with environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scriptbox-postprocess",
    about = "Rename a completed download and upload it to S3-compatible storage"
)]
pub struct CliArgs {
    /// Completion directory reported by the download manager
    #[arg(long, env = "SAB_COMPLETE_DIR")]
    pub complete_dir: Option<PathBuf>,

    /// Nominal final name of the download
    #[arg(long, env = "SAB_FINAL_NAME")]
    pub final_name: Option<String>,

    /// Download category, used in the object key
    #[arg(long, env = "SAB_CAT")]
    pub category: Option<String>,

    /// Destination bucket
    #[arg(long, env = "S3_BUCKET")]
    pub bucket: Option<String>,

    /// Object store endpoint; a bare host gets https://
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Access key ID
    #[arg(long, env = "S3_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(long, env = "S3_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Signing region
    #[arg(long, env = "S3_REGION")]
    pub region: Option<String>,

    /// Upper bound in seconds for each request
    #[arg(long, env = "UPLOAD_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Log file receiving INFO and above
    #[arg(long, env = "POSTPROCESS_INFO_LOG", default_value = "postprocess.log")]
    pub info_log: PathBuf,

    /// Log file receiving WARN and above
    #[arg(long, env = "POSTPROCESS_ERROR_LOG", default_value = "postprocess.error.log")]
    pub error_log: PathBuf,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub completion_directory: PathBuf,
    pub final_name: String,
    pub category: String,
    pub bucket: String,
    /// Endpoint, region, credentials and request timeout.
    pub storage: StorageSettings,
}

impl Settings {
    /// The completion event to resolve.
    pub fn event(&self) -> CompletionEvent {
        CompletionEvent::new(&self.completion_directory, &self.final_name)
            .with_category(&self.category)
    }

    /// Upload options honouring the configured request timeout.
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions::new().with_request_timeout(self.storage.request_timeout)
    }
}

impl TryFrom<CliArgs> for Settings {
    type Error = ConfigurationError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let completion_directory: PathBuf = args
            .complete_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigurationError::Missing {
                option: "complete-dir",
                env: "SAB_COMPLETE_DIR",
            })?;
        let final_name: String = required(args.final_name, "final-name", "SAB_FINAL_NAME")?;
        let bucket: String = required(args.bucket, "bucket", "S3_BUCKET")?;
        let endpoint: String =
            normalize_endpoint(&required(args.endpoint, "endpoint", "S3_ENDPOINT")?)?;
        let access_key: String = required(args.access_key, "access-key", "S3_ACCESS_KEY")?;
        let secret_key: String = required(args.secret_key, "secret-key", "S3_SECRET_KEY")?;

        let category: String = optional(args.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let region: String = optional(args.region).unwrap_or_else(|| DEFAULT_REGION.to_string());
        let request_timeout: Duration = match args.request_timeout_secs {
            Some(0) => {
                return Err(ConfigurationError::Invalid {
                    option: "request-timeout-secs",
                    message: "must be greater than zero".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let storage: StorageSettings =
            StorageSettings::new(endpoint, S3Credentials::new(access_key, secret_key))
                .with_region(region)
                .with_request_timeout(request_timeout);

        Ok(Self {
            completion_directory,
            final_name,
            category,
            bucket,
            storage,
        })
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    option: &'static str,
    env: &'static str,
) -> Result<String, ConfigurationError> {
    optional(value).ok_or(ConfigurationError::Missing { option, env })
}

/// Turn an endpoint option into an absolute URL.
///
/// A bare host gets `https://`; trailing slashes are removed.
///
/// # Errors
/// Returns `ConfigurationError::Invalid` for an empty host or a non-http scheme.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ConfigurationError> {
    let trimmed: &str = endpoint.trim().trim_end_matches('/');
    let url: String = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let host: &str = match url.split_once("://") {
        Some(("http", host)) | Some(("https", host)) => host,
        _ => {
            return Err(ConfigurationError::Invalid {
                option: "endpoint",
                message: format!("unsupported scheme in {}", endpoint),
            })
        }
    };
    if host.is_empty() {
        return Err(ConfigurationError::Invalid {
            option: "endpoint",
            message: "host is empty".to_string(),
        });
    }
    Ok(url)
}
