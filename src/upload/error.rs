// src/upload/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unknown upload provider: {0}")]
    UnknownProvider(String),

    #[error("{provider}: {key} is required")]
    MissingKey {
        provider: &'static str,
        key: &'static str,
    },

    #[error("{provider}: {message}")]
    InvalidConfig {
        provider: &'static str,
        message: String,
    },

    #[error("{0}: provider not configured")]
    NotConfigured(&'static str),

    #[error("{provider}: bucket {bucket} does not exist")]
    BucketMissing {
        provider: &'static str,
        bucket: String,
    },

    #[error("{provider}: {message}")]
    Backend {
        provider: &'static str,
        message: String,
    },

    #[error("invalid upload file specification '{spec}': {reason}")]
    InvalidFileSpec { spec: String, reason: &'static str },

    #[error("upload file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to stage {what}: {source}")]
    Staging {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}
