// src/config/validate.rs

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::cli::{CommonArgs, ContextArgs, DiffArgs, RunArgs, UploadArgs, WebhookArgs};
use crate::config::context::{Layers, build_context, build_layered};
use crate::config::duration::{parse_duration, parse_positive_duration};
use crate::config::model::{Invocation, ReportedPaths, UploadSettings, WebhookSettings};
use crate::delivery::{DeliveryConfig, RetryPolicy};
use crate::errors::{GhostError, Result};
use crate::exec::RunSpec;
use crate::types::AuthMode;
use crate::upload::{KNOWN_PROVIDERS, UploadError, UploadTarget, parse_upload_files};

/// Program used by `ghost diff`.
pub const DIFF_PROGRAM: &str = "diff";

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

impl TryFrom<RunArgs> for Invocation {
    type Error = GhostError;

    fn try_from(args: RunArgs) -> std::result::Result<Self, Self::Error> {
        resolve_run(args, std::env::vars())
    }
}

impl TryFrom<DiffArgs> for Invocation {
    type Error = GhostError;

    fn try_from(args: DiffArgs) -> std::result::Result<Self, Self::Error> {
        resolve_diff(args, std::env::vars())
    }
}

/// Validate `ghost run` arguments; `env` feeds context and upload config.
pub fn resolve_run<I>(args: RunArgs, env: I) -> Result<Invocation>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env: Vec<(String, String)> = env.into_iter().collect();
    let mut command = args.command.into_iter();
    let program = command
        .next()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GhostError::ConfigError("no command specified after '--'".to_string()))?;

    ensure_path("input", &args.input)?;
    ensure_path("output", &args.output)?;
    ensure_path("stderr", &args.stderr)?;
    let upload = resolve_upload(&args.upload, &args.output, &args.stderr, env.iter().cloned())?;
    let streams = StreamPaths::new(upload.as_ref(), &args.output, &args.stderr);

    let deadline = parse_deadline(&args.common)?;
    let spec = RunSpec::new(
        program,
        command.collect(),
        &args.input,
        &streams.written_output,
        &streams.written_stderr,
    )
    .with_verbose(args.common.verbose)
    .with_deadline(deadline);

    let reported = ReportedPaths {
        input: args.input,
        expected: None,
        output: streams.reported_output,
        stderr: streams.reported_stderr,
    };

    let inputs = Inputs {
        common: &args.common,
        context: &args.context,
        webhook: &args.webhook,
        upload,
    };
    finish(spec, reported, inputs, env)
}

/// Validate `ghost diff` arguments into a `diff <flags> <input> <expected>` run.
pub fn resolve_diff<I>(args: DiffArgs, env: I) -> Result<Invocation>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env: Vec<(String, String)> = env.into_iter().collect();
    ensure_path("input", &args.input)?;
    ensure_path("expected", &args.expected)?;
    ensure_path("output", &args.output)?;
    ensure_path("stderr", &args.stderr)?;
    let upload = resolve_upload(&args.upload, &args.output, &args.stderr, env.iter().cloned())?;
    let streams = StreamPaths::new(upload.as_ref(), &args.output, &args.stderr);

    let mut diff_args: Vec<String> = args
        .diff_flags
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    diff_args.push(args.input.display().to_string());
    diff_args.push(args.expected.display().to_string());

    let deadline = parse_deadline(&args.common)?;
    let spec = RunSpec::new(
        DIFF_PROGRAM,
        diff_args,
        NULL_DEVICE,
        &streams.written_output,
        &streams.written_stderr,
    )
    .with_verbose(args.common.verbose)
    .with_deadline(deadline);

    let reported = ReportedPaths {
        input: args.input,
        expected: Some(args.expected),
        output: streams.reported_output,
        stderr: streams.reported_stderr,
    };

    let inputs = Inputs {
        common: &args.common,
        context: &args.context,
        webhook: &args.webhook,
        upload,
    };
    finish(spec, reported, inputs, env)
}

/// Where the child writes its streams, and what the JSON result reports.
///
/// Without upload both are the flag values. With upload the flags read as
/// `[local:]remote`: the remote path is reported, and the child writes to
/// the local path (or a staged temporary, swapped in at run time).
struct StreamPaths {
    written_output: PathBuf,
    written_stderr: PathBuf,
    reported_output: PathBuf,
    reported_stderr: PathBuf,
}

impl StreamPaths {
    fn new(upload: Option<&UploadSettings>, output: &Path, stderr: &Path) -> Self {
        match upload {
            None => Self {
                written_output: output.to_path_buf(),
                written_stderr: stderr.to_path_buf(),
                reported_output: output.to_path_buf(),
                reported_stderr: stderr.to_path_buf(),
            },
            Some(upload) => Self {
                written_output: written(&upload.output),
                written_stderr: written(&upload.stderr),
                reported_output: PathBuf::from(&upload.output.remote),
                reported_stderr: PathBuf::from(&upload.stderr.remote),
            },
        }
    }
}

fn written(target: &UploadTarget) -> PathBuf {
    target
        .local
        .clone()
        .unwrap_or_else(|| PathBuf::from(&target.remote))
}

/// `None` when no upload provider is named.
///
/// The provider config is layered like the context: `GHOST_UPLOAD_CONFIG_*`
/// env, then `--upload-config-file`, `--upload-config`, `--upload-config-kv`.
pub fn resolve_upload<I>(
    args: &UploadArgs,
    output: &Path,
    stderr: &Path,
    env: I,
) -> Result<Option<UploadSettings>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let provider = match args.upload_provider.as_deref().map(str::trim) {
        None | Some("") if args.upload_files.iter().any(|f| !f.is_empty()) => {
            return Err(GhostError::ConfigError(
                "--upload-files requires --upload-provider".to_string(),
            ));
        }
        None | Some("") => return Ok(None),
        Some(name) => name.to_string(),
    };
    if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
        return Err(UploadError::UnknownProvider(provider).into());
    }

    let config = match build_layered(Layers::upload_config(args), env)? {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(GhostError::ConfigError(format!(
                "upload config must be a JSON object, got {other}"
            )));
        }
    };

    let output = UploadTarget::parse(&output.to_string_lossy());
    let stderr = UploadTarget::parse(&stderr.to_string_lossy());
    for (flag, target) in [("output", &output), ("stderr", &stderr)] {
        if target.remote.is_empty() {
            return Err(GhostError::ConfigError(format!(
                "--{flag} needs a remote path when uploading"
            )));
        }
    }

    let extra_files = parse_upload_files(&args.upload_files)?;
    let standard: Vec<&PathBuf> = [&output.local, &stderr.local].into_iter().flatten().collect();
    if let Some((local, _)) = extra_files.iter().find(|(l, _)| standard.contains(&l)) {
        return Err(GhostError::ConfigError(format!(
            "{} is already uploaded as a standard output file",
            local.display()
        )));
    }

    Ok(Some(UploadSettings {
        provider,
        config,
        output,
        stderr,
        extra_files,
    }))
}

/// Flag groups shared by `run` and `diff`.
struct Inputs<'a> {
    common: &'a CommonArgs,
    context: &'a ContextArgs,
    webhook: &'a WebhookArgs,
    upload: Option<UploadSettings>,
}

fn finish(
    spec: RunSpec,
    reported: ReportedPaths,
    inputs: Inputs<'_>,
    env: Vec<(String, String)>,
) -> Result<Invocation> {
    let webhook = resolve_webhook(inputs.webhook, inputs.common.verbose)?;
    let context = build_context(inputs.context, env)?;

    Ok(Invocation {
        spec,
        reported,
        dry_run: inputs.common.dry_run,
        score: inputs.common.score,
        context,
        webhook,
        upload: inputs.upload,
    })
}

fn ensure_path(flag: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(GhostError::ConfigError(format!(
            "required flag '{flag}' not set"
        )));
    }
    Ok(())
}

fn parse_deadline(common: &CommonArgs) -> Result<Option<std::time::Duration>> {
    match common.timeout.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_positive_duration(raw)
            .map(Some)
            .map_err(|e| GhostError::ConfigError(format!("invalid timeout: {e}"))),
    }
}

/// `None` when no webhook URL is configured.
pub fn resolve_webhook(args: &WebhookArgs, verbose: bool) -> Result<Option<WebhookSettings>> {
    let url = match args.webhook_url.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(url) => url.to_string(),
    };

    let auth: AuthMode = args
        .webhook_auth_type
        .parse()
        .map_err(GhostError::ConfigError)?;
    let auth_token = args
        .webhook_auth_token
        .clone()
        .filter(|t| !t.is_empty());
    if auth != AuthMode::None && auth_token.is_none() {
        return Err(GhostError::ConfigError(format!(
            "webhook auth type '{}' requires --webhook-auth-token",
            args.webhook_auth_type
        )));
    }

    let timeout = parse_positive_duration(&args.webhook_timeout)
        .map_err(|e| GhostError::ConfigError(format!("invalid webhook timeout: {e}")))?;
    let initial_delay = parse_duration(&args.webhook_retry_delay)
        .map_err(|e| GhostError::ConfigError(format!("invalid webhook retry delay: {e}")))?;

    let headers = args
        .webhook_header
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    GhostError::ConfigError(format!(
                        "invalid webhook header, expected key=value: {pair}"
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let method = args.webhook_method.trim();
    let config = DeliveryConfig {
        url,
        method: if method.is_empty() { "POST".to_string() } else { method.to_uppercase() },
        auth,
        auth_token,
        headers,
        timeout,
        verbose,
    };
    let policy = RetryPolicy {
        max_retries: args.webhook_retries,
        initial_delay,
        ..RetryPolicy::default()
    };

    Ok(Some(WebhookSettings { config, policy }))
}
