// src/delivery/client.rs

//! Webhook client with exponential-backoff retry.
//!
//! [`DeliveryClient::send`] serializes the payload once and issues up to
//! `max_retries + 1` sequential requests. Backoff waits and in-flight requests
//! are both interruptible by the overall timeout and by the caller's
//! [`CancellationToken`].

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::delivery::backoff::compute_delay;
use crate::delivery::config::{DEFAULT_DELIVERY_TIMEOUT, DeliveryConfig, RetryPolicy};
use crate::delivery::error::DeliveryError;
use crate::delivery::retry::{AttemptOutcome, RetryState, Step};
use crate::types::AuthMode;

/// Timeout for a single HTTP attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY_HEADER: &str = "x-api-key";

pub struct DeliveryClient {
    http: reqwest::Client,
    method: Method,
    headers: HeaderMap,
    config: DeliveryConfig,
    policy: RetryPolicy,
}

impl DeliveryClient {
    /// Validate the method and headers up front and build the HTTP client.
    ///
    /// A zero timeout falls back to [`DEFAULT_DELIVERY_TIMEOUT`] and a blank
    /// method to `POST`.
    pub fn new(mut config: DeliveryConfig, policy: RetryPolicy) -> Result<Self, DeliveryError> {
        if config.timeout.is_zero() {
            config.timeout = DEFAULT_DELIVERY_TIMEOUT;
        }
        let method = match config.method.trim() {
            "" => Method::POST,
            raw => Method::from_bytes(raw.to_uppercase().as_bytes())
                .map_err(|e| DeliveryError::Build(format!("method '{raw}': {e}")))?,
        };
        let headers = build_headers(&config)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        Ok(Self {
            http,
            method,
            headers,
            config,
            policy,
        })
    }

    /// Deliver `payload`; `Ok` means some attempt got a 2xx.
    pub async fn send<T>(
        &self,
        cancel: &CancellationToken,
        payload: &T,
    ) -> Result<(), DeliveryError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(payload)?;
        let deadline = Instant::now() + self.config.timeout;
        let mut state = RetryState::new(self.policy.max_retries);

        loop {
            let attempt = state.attempt();

            if attempt > 0 {
                let delay = compute_delay(attempt, &self.policy);
                self.diagnostic(format_args!(
                    "Retry {attempt}/{} after {delay:?}",
                    self.policy.max_retries
                ));
                debug!(attempt, delay_ms = delay.as_millis() as u64, "webhook backoff");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(self.abandon(DeliveryError::Cancelled { attempts: attempt }));
                    }
                    _ = sleep_until(deadline) => {
                        return Err(self.abandon(DeliveryError::Timeout { attempts: attempt }));
                    }
                    _ = sleep(delay) => {}
                }
            }

            // An attempt only counts once its request is on the way.
            if cancel.is_cancelled() {
                return Err(self.abandon(DeliveryError::Cancelled { attempts: attempt }));
            }
            if Instant::now() >= deadline {
                return Err(self.abandon(DeliveryError::Timeout { attempts: attempt }));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abandon(DeliveryError::Cancelled { attempts: attempt + 1 }));
                }
                _ = sleep_until(deadline) => {
                    return Err(self.abandon(DeliveryError::Timeout { attempts: attempt + 1 }));
                }
                outcome = self.attempt_once(body.clone()) => outcome,
            };

            match state.record(outcome) {
                Step::Delivered { status } => {
                    self.diagnostic(format_args!("Successfully sent (status: {status})"));
                    info!(
                        url = %self.config.url,
                        status,
                        attempts = attempt + 1,
                        "webhook delivered"
                    );
                    return Ok(());
                }
                Step::Retry { attempt: next, after } => {
                    warn!(
                        url = %self.config.url,
                        attempt = attempt + 1,
                        error = %after,
                        "webhook attempt failed; retrying"
                    );
                    debug!(next_attempt = next, "scheduling retry");
                }
                Step::GiveUp(err) => {
                    if let DeliveryError::NonRetryable { last, .. } = &err {
                        self.diagnostic(format_args!("Non-retryable failure ({last}), giving up"));
                    }
                    return Err(self.abandon(err));
                }
            }
        }
    }

    /// Issue one request and reduce the response to its status code.
    async fn attempt_once(&self, body: Vec<u8>) -> AttemptOutcome {
        let request = self
            .http
            .request(self.method.clone(), &self.config.url)
            .headers(self.headers.clone())
            .body(body);

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                // Drain so the connection can be reused.
                if let Err(e) = response.bytes().await {
                    debug!(error = %e, "failed to drain webhook response body");
                }
                AttemptOutcome::Response(status)
            }
            Err(e) => AttemptOutcome::Transport {
                retryable: !e.is_builder(),
                message: e.to_string(),
            },
        }
    }

    fn abandon(&self, err: DeliveryError) -> DeliveryError {
        self.diagnostic(format_args!("Error: {err}"));
        warn!(
            url = %self.config.url,
            attempts = err.attempts(),
            error = %err,
            "webhook delivery failed"
        );
        err
    }

    fn diagnostic(&self, line: std::fmt::Arguments<'_>) {
        if self.config.verbose {
            eprintln!("[WEBHOOK] {line}");
        }
    }
}

fn build_headers(config: &DeliveryConfig) -> Result<HeaderMap, DeliveryError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| DeliveryError::Build(format!("header name '{name}': {e}")))?;
        headers.insert(name, header_value(value)?);
    }

    let token = config.auth_token.as_deref().unwrap_or_default();
    match config.auth {
        AuthMode::None => {}
        AuthMode::Bearer => {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        AuthMode::ApiKey => {
            headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(token)?);
        }
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, DeliveryError> {
    HeaderValue::from_str(value)
        .map_err(|e| DeliveryError::Build(format!("header value: {e}")))
}
