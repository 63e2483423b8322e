//! AWS SDK S3 backend for scriptbox storage.
//!
//! This crate provides a `StorageClient` implementation using the AWS SDK for Rust,
//! pointed at any S3-compatible endpoint with static credentials and path-style
//! addressing.
//!
//! # Example
//!
//! ```ignore
//! use scriptbox_storage_s3::S3StorageClient;
//! use scriptbox_storage::{S3Credentials, StorageSettings, UploadOrchestrator};
//!
//! let settings = StorageSettings::new("https://s3.example.com", S3Credentials::new(ak, sk));
//! let client = S3StorageClient::new(&settings).await?;
//! let orchestrator = UploadOrchestrator::new(&client);
//! ```

mod client;
mod error;

pub use client::S3StorageClient;
pub use error::S3BackendError;
