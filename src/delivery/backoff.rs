// src/delivery/backoff.rs

//! Jittered exponential backoff.
//!
//! `delay(k) = min(initial * multiplier^(k-1), max_delay) * (1 + j)` where `j`
//! is uniform in `[-0.1, 0.1]`. Attempt 0 never waits.

use std::time::Duration;

use rand::Rng;

use crate::delivery::config::RetryPolicy;

/// Maximum relative deviation applied to the capped delay.
pub const JITTER_FRACTION: f64 = 0.1;

/// Delay to wait before `attempt` (1-based retry number).
pub fn compute_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let unit = rand::rng().random_range(-1.0..=1.0);
    compute_delay_with(attempt, policy, unit)
}

/// Deterministic core of [`compute_delay`]; `unit` in `[-1, 1]` selects the
/// point inside the jitter band.
pub fn compute_delay_with(attempt: u32, policy: &RetryPolicy, unit: f64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let base = capped_base_nanos(attempt, policy);
    let jittered = base + base * JITTER_FRACTION * unit.clamp(-1.0, 1.0);
    Duration::from_nanos(jittered.max(0.0).round() as u64)
}

/// The un-jittered delay for `attempt`, after capping.
pub fn base_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(capped_base_nanos(attempt, policy).round() as u64)
}

fn capped_base_nanos(attempt: u32, policy: &RetryPolicy) -> f64 {
    let max = policy.max_delay.as_nanos() as f64;
    let raw = policy.initial_delay.as_nanos() as f64
        * policy.multiplier.powf(f64::from(attempt - 1));
    if raw.is_finite() { raw.min(max) } else { max }
}
