use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghost::upload::{Provider, UploadError};
use serde_json::{Map, Value};

/// One file as received by [`RecordingProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub remote: String,
    pub contents: Vec<u8>,
}

#[derive(Default)]
struct Recorded {
    config: Option<Map<String, Value>>,
    uploads: Vec<UploadedFile>,
}

/// An in-memory upload provider that keeps what it was given.
///
/// Clones share their records, so a test can hand one clone to the code
/// under test and inspect the other.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    recorded: Arc<Mutex<Recorded>>,
    fail_uploads: bool,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `upload` call fails with a backend error.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<UploadedFile> {
        self.recorded.lock().unwrap().uploads.clone()
    }

    pub fn config(&self) -> Option<Map<String, Value>> {
        self.recorded.lock().unwrap().config.clone()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn configure(&mut self, config: &Map<String, Value>) -> Result<(), UploadError> {
        self.recorded.lock().unwrap().config = Some(config.clone());
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), UploadError> {
        if self.fail_uploads {
            return Err(UploadError::Backend {
                provider: "recording",
                message: format!("refusing {remote}"),
            });
        }

        let contents = tokio::fs::read(local)
            .await
            .map_err(|e| UploadError::Backend {
                provider: "recording",
                message: format!("failed to read {}: {e}", local.display()),
            })?;
        self.recorded.lock().unwrap().uploads.push(UploadedFile {
            remote: remote.to_string(),
            contents,
        });
        Ok(())
    }
}
