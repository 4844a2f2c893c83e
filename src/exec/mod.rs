// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs exactly one command per call with `tokio::process::Command`, with
//! stdin/stdout/stderr redirected to files and an optional deadline.
//!
//! - [`model`] holds the request (`RunSpec`) and outcome (`ExecutionResult`).
//! - [`runner`] owns spawning, the deadline race, and reaping.
//! - [`tee`] is the fan-out writer behind verbose stderr mirroring.
//! - [`printer`] renders the verbose / dry-run banners.

pub mod model;
pub mod printer;
pub mod runner;
pub mod tee;

pub use model::{ExecutionResult, RunSpec, TIMEOUT_EXIT_CODE};
pub use runner::{MirrorFactory, ProcessRunner};
pub use tee::{BoxedSink, TeeWriter};
