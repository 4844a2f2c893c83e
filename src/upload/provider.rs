// src/upload/provider.rs

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::UploadSettings;
use crate::upload::error::UploadError;
use crate::upload::minio::MinioProvider;

/// Provider names accepted by `--upload-provider`.
pub const KNOWN_PROVIDERS: &[&str] = &[MinioProvider::NAME];

/// A remote store that output files are copied to after the run.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Validate `config` and connect. Must succeed before [`upload`](Self::upload).
    async fn configure(&mut self, config: &Map<String, Value>) -> Result<(), UploadError>;

    /// Copy the file at `local` to `remote` (relative to any configured prefix).
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError>;
}

/// Create an unconfigured provider by name.
pub fn create_provider(name: &str) -> Result<Box<dyn Provider>, UploadError> {
    match name.trim() {
        MinioProvider::NAME => Ok(Box::new(MinioProvider::new())),
        other => Err(UploadError::UnknownProvider(other.to_string())),
    }
}

/// Create and configure the provider named in `settings`.
pub async fn connect(settings: &UploadSettings) -> Result<Box<dyn Provider>, UploadError> {
    let mut provider = create_provider(&settings.provider)?;
    provider.configure(&settings.config).await?;
    tracing::info!(provider = provider.name(), "upload provider configured");
    Ok(provider)
}
