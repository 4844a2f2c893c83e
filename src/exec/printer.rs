// src/exec/printer.rs

//! Human-readable banners printed around an execution in verbose and dry-run
//! modes. Everything goes to stderr; stdout is reserved for the JSON result.

use crate::exec::model::{ExecutionResult, RunSpec};

const RULE: &str = "========================================";
const THIN_RULE: &str = "----------------------------------------";

pub fn print_pre_execution(spec: &RunSpec, dry_run: bool) {
    eprint!("{}", render_pre_execution(spec, dry_run));
}

pub fn print_post_execution(result: &ExecutionResult, dry_run: bool) {
    eprint!("{}", render_post_execution(result, dry_run));
}

fn render_pre_execution(spec: &RunSpec, dry_run: bool) -> String {
    let header = if dry_run {
        "Ghost Command Execution Details (DRY RUN)"
    } else {
        "Ghost Command Execution Details"
    };

    let mut out = String::new();
    out.push_str(&format!("{RULE}\n{header}\n{RULE}\n"));
    out.push_str(&format!("Command: {}\n", spec.command_line()));
    out.push_str(&format!("Input:   {}\n", spec.input.display()));
    out.push_str(&format!("Output:  {}\n", spec.output.display()));
    out.push_str(&format!("Stderr:  {}\n", spec.stderr.display()));
    if let Some(deadline) = spec.effective_deadline() {
        out.push_str(&format!("Timeout: {deadline:?}\n"));
    }
    out.push_str(THIN_RULE);
    out.push('\n');

    if dry_run {
        out.push_str("[DRY RUN] Command would be executed here\n");
    } else {
        out.push_str("Command Output:\n");
    }
    out.push_str(THIN_RULE);
    out.push('\n');
    out
}

fn render_post_execution(result: &ExecutionResult, dry_run: bool) -> String {
    let header = if dry_run {
        "Execution Results (DRY RUN - Simulated):"
    } else {
        "Execution Results:"
    };

    format!(
        "{THIN_RULE}\n{header}\n{THIN_RULE}\n\
         Status:         {}\n\
         Exit Code:      {}\n\
         Execution Time: {} ms\n\
         {RULE}\n",
        result.status, result.exit_code, result.execution_time
    )
}
