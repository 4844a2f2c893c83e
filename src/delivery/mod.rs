// src/delivery/mod.rs

//! Result delivery to an HTTP endpoint.
//!
//! - [`config`]: endpoint settings and the retry policy.
//! - [`backoff`]: pure jittered exponential backoff.
//! - [`retry`]: retryable-status taxonomy and the attempt state machine.
//! - [`client`]: the `reqwest`-based sender driving the above.

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use backoff::compute_delay;
pub use client::DeliveryClient;
pub use config::{DeliveryConfig, RetryPolicy};
pub use error::{AttemptFailure, DeliveryError};
pub use retry::is_retryable_status;
