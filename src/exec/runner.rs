// src/exec/runner.rs

//! Single-shot process runner.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{GhostError, Result};
use crate::exec::model::{ExecutionResult, RunSpec, UNDECODED_EXIT_CODE};
use crate::exec::tee::{BoxedSink, TeeWriter};

/// How long the stderr mirror may keep draining after the child is reaped.
///
/// Grandchildren can inherit the pipe and keep it open; we stop waiting for
/// them after this.
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);

const PUMP_BUFFER_SIZE: usize = 8 * 1024;

/// Produces the stream that verbose mode mirrors child stderr onto.
pub type MirrorFactory = Arc<dyn Fn() -> BoxedSink + Send + Sync>;

/// How the wait on the child ended.
enum Exit {
    Exited(ExitStatus),
    TimedOut,
}

/// Runs one command per `execute()` call.
///
/// The runner holds no per-run state, so a single instance can serve many
/// concurrent executions. Cancelling the token kills and reaps any child
/// that is still running and makes `execute()` return
/// [`GhostError::Cancelled`].
#[derive(Clone)]
pub struct ProcessRunner {
    cancel: CancellationToken,
    mirror: MirrorFactory,
}

impl ProcessRunner {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            mirror: Arc::new(|| Box::new(tokio::io::stderr()) as BoxedSink),
        }
    }

    /// Replace the verbose-mode mirror (our own stderr by default).
    pub fn with_stderr_mirror(mut self, mirror: MirrorFactory) -> Self {
        self.mirror = mirror;
        self
    }

    /// Run `spec` to completion, timeout, or cancellation.
    ///
    /// Nonzero exits and timeouts are returned as `Ok`. Errors mean no result
    /// exists: redirect files could not be opened, the program could not be
    /// started, or the run was cancelled.
    pub async fn execute(&self, spec: &RunSpec) -> Result<ExecutionResult> {
        let command_line = spec.command_line();

        let input = File::open(&spec.input)
            .map_err(|e| GhostError::io("opening input file", &spec.input, e))?;
        let output = create_file_with_dir(&spec.output, "creating output file")?;
        let stderr_file = create_file_with_dir(&spec.stderr, "creating stderr file")?;

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output))
            .kill_on_drop(true);

        let mirrored_file = if spec.verbose {
            cmd.stderr(Stdio::piped());
            Some(stderr_file)
        } else {
            cmd.stderr(Stdio::from(stderr_file));
            None
        };

        let deadline = spec.effective_deadline();
        info!(
            cmd = %command_line,
            deadline_ms = deadline.map(|d| d.as_millis() as u64),
            verbose = spec.verbose,
            "starting process"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| GhostError::ProcessStart {
            command: spec.command.clone(),
            source,
        })?;

        let pump = match (mirrored_file, child.stderr.take()) {
            (Some(file), Some(pipe)) => {
                let sinks: Vec<BoxedSink> =
                    vec![Box::new(tokio::fs::File::from_std(file)), (self.mirror)()];
                Some(tokio::spawn(pump_stderr(pipe, TeeWriter::new(sinks))))
            }
            _ => None,
        };

        let exit = wait_for_exit(&mut child, deadline, &self.cancel, &command_line).await;
        let elapsed = started.elapsed();

        let pump_result = match pump {
            Some(handle) if exit.is_ok() => finish_pump(handle).await,
            Some(handle) => {
                handle.abort();
                Ok(())
            }
            None => Ok(()),
        };

        let result = match exit? {
            Exit::Exited(status) => {
                let exit_code = status.code().unwrap_or_else(|| {
                    debug!(cmd = %command_line, ?status, "exit status has no code");
                    UNDECODED_EXIT_CODE
                });
                ExecutionResult::exited(command_line, exit_code, elapsed)
            }
            Exit::TimedOut => ExecutionResult::timed_out(command_line, elapsed),
        };

        pump_result.map_err(|e| GhostError::io("mirroring command stderr", &spec.stderr, e))?;

        info!(
            cmd = %result.command,
            status = %result.status,
            exit_code = result.exit_code,
            execution_time_ms = result.execution_time,
            "process finished"
        );

        Ok(result)
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Race process exit against the deadline and caller cancellation.
///
/// On the timer and cancellation paths the child is killed and then always
/// reaped before returning.
async fn wait_for_exit(
    child: &mut Child,
    deadline: Option<Duration>,
    cancel: &CancellationToken,
    command_line: &str,
) -> Result<Exit> {
    let timer = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| {
                GhostError::Other(anyhow::Error::new(e).context(format!(
                    "waiting for process '{command_line}'"
                )))
            })?;
            Ok(Exit::Exited(status))
        }

        _ = timer => {
            info!(cmd = %command_line, "deadline elapsed; killing process");
            terminate(child, command_line).await;
            Ok(Exit::TimedOut)
        }

        _ = cancel.cancelled() => {
            info!(cmd = %command_line, "cancellation requested; killing process");
            terminate(child, command_line).await;
            Err(GhostError::Cancelled)
        }
    }
}

/// Best-effort kill followed by a mandatory reap.
async fn terminate(child: &mut Child, command_line: &str) {
    if let Err(e) = child.start_kill() {
        warn!(cmd = %command_line, error = %e, "failed to kill child process");
    }
    match child.wait().await {
        Ok(status) => debug!(cmd = %command_line, ?status, "child reaped"),
        Err(e) => warn!(cmd = %command_line, error = %e, "failed to reap child process"),
    }
}

async fn pump_stderr<R>(mut pipe: R, mut tee: TeeWriter<BoxedSink>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; PUMP_BUFFER_SIZE];
    let mut first_err = None;

    loop {
        let n = pipe.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        // Keep draining after a sink error so the child never blocks on a
        // full pipe and healthy sinks stay complete.
        if let Err(e) = tee.write_chunk(&buf[..n]).await {
            if first_err.is_none() {
                warn!(error = %e, "stderr mirror write failed");
                first_err = Some(e);
            }
        }
    }

    if let Err(e) = tee.flush().await {
        first_err.get_or_insert(e);
    }
    first_err.map_or(Ok(()), Err)
}

async fn finish_pump(mut handle: JoinHandle<io::Result<()>>) -> io::Result<()> {
    match tokio::time::timeout(STDERR_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(res)) => res,
        Ok(Err(join_err)) => Err(io::Error::other(join_err)),
        Err(_) => {
            debug!("stderr pipe still open after child exit; abandoning mirror");
            handle.abort();
            Ok(())
        }
    }
}

/// Create `path` fresh, making any missing parent directories first.
fn create_file_with_dir(path: &Path, context: &'static str) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| GhostError::io("creating parent directory", parent, e))?;
        }
    }
    File::create(path).map_err(|e| GhostError::io(context, path, e))
}
