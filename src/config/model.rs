// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::delivery::{DeliveryConfig, RetryPolicy};
use crate::exec::RunSpec;
use crate::upload::UploadTarget;

/// Everything one `ghost` invocation needs, resolved and validated once.
///
/// Built by [`resolve_run`](crate::config::resolve_run) or
/// [`resolve_diff`](crate::config::resolve_diff) and threaded by value into
/// the runner and the delivery client.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub spec: RunSpec,
    /// Paths echoed in the JSON result. For `diff` the runner reads stdin
    /// from the null device, but the reported input is the compared file.
    pub reported: ReportedPaths,
    pub dry_run: bool,
    pub score: Option<i64>,
    pub context: Option<Value>,
    pub webhook: Option<WebhookSettings>,
    pub upload: Option<UploadSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedPaths {
    pub input: PathBuf,
    pub expected: Option<PathBuf>,
    pub output: PathBuf,
    pub stderr: PathBuf,
}

impl Invocation {
    pub fn deadline(&self) -> Option<Duration> {
        self.spec.effective_deadline()
    }

    pub fn verbose(&self) -> bool {
        self.spec.verbose
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookSettings {
    pub config: DeliveryConfig,
    pub policy: RetryPolicy,
}

/// Resolved `--upload-*` flags. The remote paths are the ones reported in
/// the JSON result; `output.local` / `stderr.local` are what the child
/// writes to when set.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub provider: String,
    pub config: Map<String, Value>,
    pub output: UploadTarget,
    pub stderr: UploadTarget,
    pub extra_files: Vec<(PathBuf, String)>,
}
