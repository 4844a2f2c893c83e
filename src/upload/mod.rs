// src/upload/mod.rs

//! Shipping the run's output files to object storage.
//!
//! - [`provider`] defines the [`Provider`] trait and the name registry.
//! - [`minio`] is the S3-compatible backend (MinIO, AWS S3).
//! - [`staging`] decides where the child writes locally and which remote
//!   path each file ends up at, then drives the uploads.

pub mod error;
pub mod minio;
pub mod provider;
pub mod staging;

pub use error::UploadError;
pub use provider::{KNOWN_PROVIDERS, Provider, connect, create_provider};
pub use staging::{
    UploadStaging, UploadTarget, parse_upload_files, render_dry_run_plan, render_upload_info,
};
