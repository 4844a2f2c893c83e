// src/output.rs

//! The JSON document printed on stdout (and delivered to the webhook).

use serde::Serialize;
use serde_json::Value;

use crate::config::Invocation;
use crate::delivery::DeliveryError;
use crate::errors::Result;
use crate::exec::ExecutionResult;
use crate::types::ExecutionStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonResult {
    pub command: String,
    pub status: ExecutionStatus,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub output: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Milliseconds.
    pub execution_time: u64,
    /// Configured deadline in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_error: Option<String>,
}

impl JsonResult {
    pub fn new(invocation: &Invocation, result: &ExecutionResult) -> Self {
        let paths = &invocation.reported;
        Self {
            command: result.command.clone(),
            status: result.status,
            input: paths.input.display().to_string(),
            expected: paths.expected.as_ref().map(|p| p.display().to_string()),
            output: paths.output.display().to_string(),
            stderr: paths.stderr.display().to_string(),
            exit_code: result.exit_code,
            execution_time: result.execution_time,
            timeout: invocation.deadline().map(|d| d.as_millis() as u64),
            score: invocation.score.map(|s| awarded_score(s, result)),
            context: invocation.context.clone(),
            webhook_sent: None,
            webhook_error: None,
        }
    }

    /// Copy of the result without the webhook bookkeeping fields.
    pub fn webhook_payload(&self) -> Self {
        Self {
            webhook_sent: None,
            webhook_error: None,
            ..self.clone()
        }
    }

    pub fn record_delivery(&mut self, outcome: std::result::Result<(), DeliveryError>) {
        match outcome {
            Ok(()) => {
                self.webhook_sent = Some(true);
                self.webhook_error = None;
            }
            Err(err) => {
                self.webhook_sent = Some(false);
                self.webhook_error = Some(err.to_string());
            }
        }
    }

    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The configured score is only awarded on a clean exit.
fn awarded_score(score: i64, result: &ExecutionResult) -> i64 {
    if result.exit_code == 0 { score } else { 0 }
}

pub fn print_result(result: &JsonResult) -> Result<()> {
    println!("{}", result.to_json_line()?);
    Ok(())
}
