#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ghost::exec::RunSpec;

/// Builder for `RunSpec` rooted in a scratch directory.
///
/// Redirect files default to `<root>/input.txt`, `<root>/out/stdout.txt` and
/// `<root>/out/stderr.txt`. The input file is written by [`build`](Self::build).
pub struct RunSpecBuilder {
    root: PathBuf,
    command: String,
    args: Vec<String>,
    stdin: Vec<u8>,
    verbose: bool,
    deadline: Option<Duration>,
}

impl RunSpecBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            command: "true".to_string(),
            args: vec![],
            stdin: vec![],
            verbose: false,
            deadline: None,
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(mut self, script: &str) -> Self {
        self.command = "sh".to_string();
        self.args = vec!["-c".to_string(), script.to_string()];
        self
    }

    pub fn command(mut self, command: &str, args: &[&str]) -> Self {
        self.command = command.to_string();
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn stdin(mut self, contents: &[u8]) -> Self {
        self.stdin = contents.to_vec();
        self
    }

    pub fn verbose(mut self, val: bool) -> Self {
        self.verbose = val;
        self
    }

    pub fn deadline_ms(mut self, ms: u64) -> Self {
        self.deadline = Some(Duration::from_millis(ms));
        self
    }

    pub fn input_path(&self) -> PathBuf {
        self.root.join("input.txt")
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join("out").join("stdout.txt")
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.root.join("out").join("stderr.txt")
    }

    pub fn build(self) -> RunSpec {
        fs::create_dir_all(&self.root).expect("failed to create scratch root");
        fs::write(self.input_path(), &self.stdin).expect("failed to write input file");

        RunSpec::new(
            self.command.clone(),
            self.args.clone(),
            self.input_path(),
            self.output_path(),
            self.stderr_path(),
        )
        .with_verbose(self.verbose)
        .with_deadline(self.deadline)
    }
}
