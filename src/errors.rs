// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only conditions that prevent an [`ExecutionResult`](crate::exec::ExecutionResult)
//! from being produced live here. A nonzero exit code or a timeout is a normal
//! result, and webhook failures are reported through
//! [`DeliveryError`](crate::delivery::DeliveryError) as data. Upload
//! failures are fatal, since the reported paths would point at nothing.

use std::path::PathBuf;

use thiserror::Error;

use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum GhostError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {context} ({path:?}): {source}")]
    IoError {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start command '{command}': {source}")]
    ProcessStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execution cancelled")]
    Cancelled,

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GhostError {
    /// Attach a short description and the offending path to an I/O error.
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GhostError::IoError {
            context,
            path: path.into(),
            source,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GhostError>;
