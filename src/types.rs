use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Outcome class of a single command execution.
///
/// - `Success`: the process exited normally with code 0 before any deadline.
/// - `Failed`: the process exited normally with a nonzero code.
/// - `Timeout`: the deadline elapsed first; the process was killed and reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Timeout,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication scheme applied to webhook requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No authentication header.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `X-API-Key: <token>`.
    ApiKey,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(AuthMode::None),
            "bearer" => Ok(AuthMode::Bearer),
            "api-key" | "apikey" | "api_key" => Ok(AuthMode::ApiKey),
            other => Err(format!(
                "invalid webhook auth type: {other} (expected \"none\", \"bearer\" or \"api-key\")"
            )),
        }
    }
}
