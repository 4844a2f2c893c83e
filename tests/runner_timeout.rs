// tests/runner_timeout.rs
#![cfg(unix)]

use std::time::{Duration, Instant};

use ghost::errors::GhostError;
use ghost::exec::{ProcessRunner, TIMEOUT_EXIT_CODE};
use ghost::types::ExecutionStatus;
use ghost_test_utils::builders::RunSpecBuilder;
use ghost_test_utils::{init_tracing, within_limit};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn deadline_kills_long_running_command() {
    init_tracing();
    let dir = tempdir().unwrap();
    let spec = RunSpecBuilder::new(dir.path())
        .command("sleep", &["5"])
        .deadline_ms(100)
        .build();

    let started = Instant::now();
    let result = within_limit(ProcessRunner::default().execute(&spec))
        .await
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(result.execution_time >= 100, "took {}ms", result.execution_time);
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn fast_command_beats_its_deadline() {
    let dir = tempdir().unwrap();
    let spec = RunSpecBuilder::new(dir.path())
        .shell("echo quick")
        .deadline_ms(10_000)
        .build();

    let result = ProcessRunner::default().execute(&spec).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn zero_deadline_means_no_limit() {
    let dir = tempdir().unwrap();
    let spec = RunSpecBuilder::new(dir.path())
        .command("sleep", &["0.2"])
        .deadline_ms(0)
        .build();

    let result = ProcessRunner::default().execute(&spec).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Success);
}

#[tokio::test]
async fn cancellation_kills_and_returns_promptly() {
    init_tracing();
    let dir = tempdir().unwrap();
    let spec = RunSpecBuilder::new(dir.path()).command("sleep", &["30"]).build();

    let cancel = CancellationToken::new();
    let runner = ProcessRunner::new(cancel.clone());
    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = within_limit(runner.execute(&spec)).await.unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, GhostError::Cancelled), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn verbose_timeout_does_not_hang_on_stderr_pipe() {
    let dir = tempdir().unwrap();
    let spec = RunSpecBuilder::new(dir.path())
        .shell("echo started >&2; sleep 5")
        .verbose(true)
        .deadline_ms(200)
        .build();
    let mirror = ghost_test_utils::buffer::SharedBuffer::new();
    let runner = ProcessRunner::default().with_stderr_mirror(mirror.mirror_factory());

    let started = Instant::now();
    let result = within_limit(runner.execute(&spec)).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Timeout);
    // The orphaned `sleep` may hold the pipe; the drain grace bounds the wait.
    assert!(started.elapsed() < Duration::from_secs(3));
}
