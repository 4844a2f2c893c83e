// src/upload/staging.rs

//! Local/remote path bookkeeping around an upload-enabled run.
//!
//! With a provider configured, `-o` and `-e` name remote paths. The child
//! writes to a temporary file unless a local copy is requested with
//! `local:remote`; temporaries are removed when the staging is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::info;

use crate::config::UploadSettings;
use crate::exec::RunSpec;
use crate::upload::error::UploadError;
use crate::upload::provider::Provider;

const RULE: &str = "========================================";
const THIN_RULE: &str = "----------------------------------------";

/// Where one of the command's output streams ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Local copy to keep; `None` means a temporary file.
    pub local: Option<PathBuf>,
    pub remote: String,
}

impl UploadTarget {
    /// `local:remote` keeps a local copy; a bare path is remote-only.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((local, remote)) => {
                let local = local.trim();
                Self {
                    local: (!local.is_empty()).then(|| PathBuf::from(local)),
                    remote: remote.trim().to_string(),
                }
            }
            None => Self {
                local: None,
                remote: raw.trim().to_string(),
            },
        }
    }
}

/// Parse `--upload-files` entries (`local[:remote]`; remote defaults to local).
pub fn parse_upload_files(entries: &[String]) -> Result<Vec<(PathBuf, String)>, UploadError> {
    let mut files: Vec<(PathBuf, String)> = Vec::new();

    for entry in entries.iter().filter(|e| !e.is_empty()) {
        let (local, remote) = match entry.split_once(':') {
            Some((local, remote)) => (local.trim(), remote.trim()),
            None => (entry.trim(), entry.trim()),
        };
        let invalid = |reason| UploadError::InvalidFileSpec {
            spec: entry.clone(),
            reason,
        };
        if local.is_empty() {
            return Err(invalid("empty local path"));
        }
        if remote.is_empty() {
            return Err(invalid("empty remote path"));
        }

        let local = PathBuf::from(local);
        if files.iter().any(|(seen, _)| *seen == local) {
            return Err(invalid("duplicate local path"));
        }
        files.push((local, remote.to_string()));
    }

    Ok(files)
}

struct StagedFile {
    path: PathBuf,
    remote: String,
    _temp: Option<TempPath>,
}

impl StagedFile {
    fn new(target: &UploadTarget, what: &'static str) -> Result<Self, UploadError> {
        let remote = target.remote.clone();
        match &target.local {
            Some(path) => Ok(Self {
                path: path.clone(),
                remote,
                _temp: None,
            }),
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("ghost-{what}-"))
                    .suffix(".txt")
                    .tempfile()
                    .map_err(|source| UploadError::Staging { what, source })?
                    .into_temp_path();
                Ok(Self {
                    path: temp.to_path_buf(),
                    remote,
                    _temp: Some(temp),
                })
            }
        }
    }
}

/// Files of one upload-enabled run, from execution to upload.
pub struct UploadStaging {
    output: StagedFile,
    stderr: StagedFile,
    extra: Vec<(PathBuf, String)>,
}

impl UploadStaging {
    pub fn prepare(settings: &UploadSettings) -> Result<Self, UploadError> {
        Ok(Self {
            output: StagedFile::new(&settings.output, "output")?,
            stderr: StagedFile::new(&settings.stderr, "stderr")?,
            extra: settings.extra_files.clone(),
        })
    }

    /// `spec` with stdout/stderr pointed at the staged local files.
    pub fn apply(&self, spec: &RunSpec) -> RunSpec {
        let mut staged = spec.clone();
        staged.output = self.output.path.clone();
        staged.stderr = self.stderr.path.clone();
        staged
    }

    /// Every (local, remote) pair, standard streams first.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        [&self.output, &self.stderr]
            .into_iter()
            .map(|f| (f.path.as_path(), f.remote.as_str()))
            .chain(self.extra.iter().map(|(l, r)| (l.as_path(), r.as_str())))
    }

    /// Upload everything, stopping at the first failure.
    ///
    /// Additional files are checked up front, since the command itself may
    /// have been the one producing them.
    pub async fn upload_all(
        &self,
        provider: &dyn Provider,
        verbose: bool,
    ) -> Result<(), UploadError> {
        for (local, _) in &self.extra {
            if !tokio::fs::try_exists(local).await.unwrap_or(false) {
                return Err(UploadError::MissingFile(local.clone()));
            }
        }

        for (local, remote) in self.files() {
            provider.upload(local, remote).await?;
            info!(provider = provider.name(), local = %local.display(), remote, "file uploaded");
            if verbose {
                eprintln!("✓ Uploaded to: {remote}");
            }
        }
        Ok(())
    }
}

/// Provider summary printed in verbose and dry-run modes. Credentials are
/// never echoed.
pub fn render_upload_info(settings: &UploadSettings, dry_run: bool) -> String {
    let header = if dry_run {
        "Upload Configuration (DRY RUN)"
    } else {
        "Upload Configuration"
    };

    let mut out = format!("{RULE}\n{header}\n{RULE}\n");
    out.push_str(&format!("Provider:       {}\n", settings.provider));
    for (key, label) in [("endpoint", "Endpoint"), ("bucket", "Bucket"), ("prefix", "Prefix")] {
        match settings.config.get(key) {
            Some(serde_json::Value::String(s)) if s.is_empty() => {}
            Some(serde_json::Value::String(s)) => out.push_str(&format!("{label:<16}{s}\n")),
            Some(other) => out.push_str(&format!("{label:<16}{other}\n")),
            None => {}
        }
    }
    for (key, label) in [("access_key", "Access Key:"), ("secret_key", "Secret Key:")] {
        if settings.config.contains_key(key) {
            out.push_str(&format!("{label:<16}***REDACTED***\n"));
        }
    }
    out.push_str(&format!("Output Path:    {}\n", settings.output.remote));
    out.push_str(&format!("Stderr Path:    {}\n", settings.stderr.remote));
    if !settings.extra_files.is_empty() {
        out.push_str("Additional Files:\n");
        for (local, remote) in &settings.extra_files {
            out.push_str(&format!("  {} → {remote}\n", local.display()));
        }
    }
    out.push_str(THIN_RULE);
    out.push('\n');
    out
}

/// What a dry run would have uploaded.
pub fn render_dry_run_plan(settings: &UploadSettings) -> String {
    let mut out = String::from("[DRY RUN] Would upload the following files:\n");
    for target in [&settings.output, &settings.stderr] {
        let local = match &target.local {
            Some(path) => path.display().to_string(),
            None => "<temporary file>".to_string(),
        };
        out.push_str(&format!("  {local} → {} (standard)\n", target.remote));
    }
    for (local, remote) in &settings.extra_files {
        out.push_str(&format!("  {} → {remote} (additional)\n", local.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings(output: &str, stderr: &str) -> UploadSettings {
        let config = match json!({
            "endpoint": "minio:9000",
            "bucket": "results",
            "access_key": "AKIA",
            "secret_key": "hunter2",
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        UploadSettings {
            provider: "minio".into(),
            config,
            output: UploadTarget::parse(output),
            stderr: UploadTarget::parse(stderr),
            extra_files: vec![(PathBuf::from("report.html"), "reports/1.html".into())],
        }
    }

    #[test]
    fn target_syntax() {
        assert_eq!(
            UploadTarget::parse("out.txt"),
            UploadTarget {
                local: None,
                remote: "out.txt".into()
            }
        );
        assert_eq!(
            UploadTarget::parse(" keep/out.txt : runs/1/out.txt "),
            UploadTarget {
                local: Some(PathBuf::from("keep/out.txt")),
                remote: "runs/1/out.txt".into()
            }
        );
        assert_eq!(UploadTarget::parse(":runs/out.txt").local, None);
    }

    #[test]
    fn upload_files_parse_and_validate() {
        let files = parse_upload_files(&[
            "a.txt".to_string(),
            String::new(),
            "b.txt:remote/b.txt".to_string(),
        ])
        .unwrap();
        assert_eq!(
            files,
            vec![
                (PathBuf::from("a.txt"), "a.txt".to_string()),
                (PathBuf::from("b.txt"), "remote/b.txt".to_string()),
            ]
        );

        for bad in [":r", "l:", "a.txt"] {
            let entries = vec!["a.txt".to_string(), bad.to_string()];
            assert!(
                matches!(parse_upload_files(&entries), Err(UploadError::InvalidFileSpec { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn remote_only_targets_get_temporary_files() {
        let settings = settings("runs/out.txt", "keep.err:runs/err.txt");
        let staging = UploadStaging::prepare(&settings).unwrap();
        let spec = RunSpec::new("true", vec![], "in", "runs/out.txt", "keep.err");
        let staged = staging.apply(&spec);

        assert_ne!(staged.output, PathBuf::from("runs/out.txt"));
        assert!(staged.output.exists());
        assert_eq!(staged.stderr, PathBuf::from("keep.err"));

        let remotes: Vec<&str> = staging.files().map(|(_, r)| r).collect();
        assert_eq!(remotes, ["runs/out.txt", "runs/err.txt", "reports/1.html"]);

        let temp = staged.output.clone();
        drop(staging);
        assert!(!temp.exists());
    }

    #[test]
    fn upload_info_redacts_credentials() {
        let text = render_upload_info(&settings("o", "e"), true);

        assert!(text.contains("Upload Configuration (DRY RUN)"));
        assert!(text.contains("Bucket:         results"));
        assert!(text.contains("Secret Key:     ***REDACTED***"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("AKIA"));
        assert!(text.contains("report.html → reports/1.html"));
    }

    #[test]
    fn dry_run_plan_lists_standard_then_additional() {
        let text = render_dry_run_plan(&settings("runs/out.txt", "keep.err:runs/err.txt"));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "  <temporary file> → runs/out.txt (standard)");
        assert_eq!(lines[2], "  keep.err → runs/err.txt (standard)");
        assert_eq!(lines[3], "  report.html → reports/1.html (additional)");
    }
}
