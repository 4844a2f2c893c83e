// src/delivery/error.rs

use std::fmt;

use thiserror::Error;

/// Why a single delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// No usable response (connect error, request timeout, bad URL...).
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Status(code) => write!(f, "status {code}"),
            AttemptFailure::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// A webhook that could not be delivered.
///
/// Always recoverable: callers record it next to the execution result rather
/// than failing the invocation.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid webhook configuration: {0}")]
    Build(String),

    #[error("webhook rejected after {attempts} attempt(s): {last}")]
    NonRetryable { attempts: u32, last: AttemptFailure },

    #[error("webhook failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },

    #[error("webhook timeout after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("webhook cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl DeliveryError {
    /// Number of HTTP attempts issued before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryError::Serialize(_) | DeliveryError::Build(_) => 0,
            DeliveryError::NonRetryable { attempts, .. }
            | DeliveryError::Exhausted { attempts, .. }
            | DeliveryError::Timeout { attempts }
            | DeliveryError::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeliveryError::Cancelled { .. })
    }
}
