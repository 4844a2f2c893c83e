// src/delivery/config.rs

use std::time::Duration;

use crate::types::AuthMode;

/// Default overall budget for one `send()`, retries included.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry parameters for the webhook client.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound on the un-jittered delay.
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Where and how results are delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryConfig {
    pub url: String,
    /// HTTP method name, `POST` unless overridden.
    pub method: String,
    pub auth: AuthMode,
    pub auth_token: Option<String>,
    /// Extra request headers, applied before authentication headers.
    pub headers: Vec<(String, String)>,
    /// Bounds the whole send, backoff waits included.
    pub timeout: Duration,
    /// Emit one `[WEBHOOK]` line per attempt on stderr.
    pub verbose: bool,
}

impl DeliveryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            auth: AuthMode::None,
            auth_token: None,
            headers: Vec::new(),
            timeout: DEFAULT_DELIVERY_TIMEOUT,
            verbose: false,
        }
    }
}
