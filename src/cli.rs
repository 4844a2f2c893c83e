// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Webhook settings also read `GHOST_WEBHOOK_*` environment variables; an
//! explicit flag always wins over the environment. Upload provider settings
//! are layered like `--context` (see [`crate::config::context`]).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `ghost`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ghost",
    version,
    about = "Run a command with redirected I/O and report structured results.",
    long_about = "Execute a command while capturing execution metadata (status, exit code, \
                  timing). The result is printed as one JSON line on stdout and can \
                  optionally be delivered to a webhook. Output files can be \
                  uploaded to object storage."
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GHOST_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Execute a command with structured output.
    ///
    /// Example: ghost run -i input.txt -o output.txt -e error.log -- ./my-command arg1
    Run(RunArgs),

    /// Compare two files with `diff` and report the result.
    ///
    /// Exit code 0 means identical, 1 means the files differ.
    Diff(DiffArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// File redirected to the command's stdin.
    #[arg(short = 'i', long, value_name = "PATH")]
    pub input: PathBuf,

    /// File capturing the command's stdout. With an upload provider this
    /// is the remote path, or `local:remote` to also keep a local copy.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// File capturing the command's stderr.
    #[arg(short = 'e', long, value_name = "PATH")]
    pub stderr: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    pub webhook: WebhookArgs,

    #[command(flatten)]
    pub upload: UploadArgs,

    /// The command to run and its arguments, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    /// File to compare.
    #[arg(short = 'i', long, value_name = "PATH")]
    pub input: PathBuf,

    /// File to compare against.
    #[arg(short = 'x', long, value_name = "PATH")]
    pub expected: PathBuf,

    /// File receiving the diff output.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// File capturing diff's stderr.
    #[arg(short = 'e', long, value_name = "PATH")]
    pub stderr: PathBuf,

    /// Extra flags for diff, e.g. "--ignore-trailing-space -B".
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub diff_flags: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    pub webhook: WebhookArgs,

    #[command(flatten)]
    pub upload: UploadArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Mirror the command's stderr on the terminal and print banners.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print what would run, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Deadline for the command (e.g. 500ms, 30s, 2m).
    #[arg(short = 't', long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Score reported when the command exits 0 (reported as 0 otherwise).
    #[arg(long, allow_negative_numbers = true)]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ContextArgs {
    /// Context data as a JSON string.
    #[arg(long = "context", value_name = "JSON")]
    pub json: Option<String>,

    /// Context key=value pair (repeatable).
    #[arg(long = "context-kv", value_name = "KEY=VALUE")]
    pub kv: Vec<String>,

    /// Path to a JSON file containing context data.
    #[arg(long = "context-file", value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UploadArgs {
    /// Upload provider for the output and stderr files (e.g. minio).
    #[arg(long, value_name = "NAME")]
    pub upload_provider: Option<String>,

    /// Provider configuration as a JSON string.
    #[arg(long, value_name = "JSON")]
    pub upload_config: Option<String>,

    /// Provider configuration key=value pair (repeatable).
    #[arg(long, value_name = "KEY=VALUE")]
    pub upload_config_kv: Vec<String>,

    /// Path to a JSON file containing provider configuration.
    #[arg(long, value_name = "PATH")]
    pub upload_config_file: Option<PathBuf>,

    /// Additional file to upload after the run (repeatable).
    #[arg(long = "upload-files", value_name = "LOCAL[:REMOTE]")]
    pub upload_files: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct WebhookArgs {
    /// Endpoint that receives the JSON result.
    #[arg(long, env = "GHOST_WEBHOOK_URL", value_name = "URL")]
    pub webhook_url: Option<String>,

    #[arg(long, env = "GHOST_WEBHOOK_METHOD", default_value = "POST")]
    pub webhook_method: String,

    /// Authentication type: none, bearer, api-key.
    #[arg(long, env = "GHOST_WEBHOOK_AUTH_TYPE", default_value = "none")]
    pub webhook_auth_type: String,

    #[arg(long, env = "GHOST_WEBHOOK_AUTH_TOKEN", hide_env_values = true)]
    pub webhook_auth_token: Option<String>,

    /// Extra request header as key=value (repeatable).
    #[arg(long, value_name = "KEY=VALUE")]
    pub webhook_header: Vec<String>,

    /// Maximum retries after the first attempt (0 = no retries).
    #[arg(long, env = "GHOST_WEBHOOK_RETRIES", default_value_t = 3)]
    pub webhook_retries: u32,

    /// Initial delay between retries.
    #[arg(long, env = "GHOST_WEBHOOK_RETRY_DELAY", default_value = "1s")]
    pub webhook_retry_delay: String,

    /// Total budget for delivery, retries included.
    #[arg(long, env = "GHOST_WEBHOOK_TIMEOUT", default_value = "30s")]
    pub webhook_timeout: String,
}

impl Default for WebhookArgs {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_method: "POST".to_string(),
            webhook_auth_type: "none".to_string(),
            webhook_auth_token: None,
            webhook_header: Vec::new(),
            webhook_retries: 3,
            webhook_retry_delay: "1s".to_string(),
            webhook_timeout: "30s".to_string(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
