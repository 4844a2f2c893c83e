// src/delivery/retry.rs

//! Retry bookkeeping for the webhook client, kept free of I/O so the
//! termination rules can be tested directly.

use crate::delivery::error::{AttemptFailure, DeliveryError};

/// Statuses for which another attempt is sanctioned.
pub const RETRYABLE_STATUSES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

pub fn is_retryable_status(code: u16) -> bool {
    RETRYABLE_STATUSES.contains(&code)
}

/// Result of one HTTP attempt, as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Any status; 2xx counts as delivered.
    Response(u16),
    Transport { message: String, retryable: bool },
}

/// What the client should do after recording an outcome.
#[derive(Debug)]
pub enum Step {
    Delivered { status: u16 },
    /// Wait for the backoff of `attempt`, then issue it.
    Retry { attempt: u32, after: AttemptFailure },
    GiveUp(DeliveryError),
}

/// Attempt counter plus the last failure.
#[derive(Debug, Clone)]
pub struct RetryState {
    max_retries: u32,
    attempt: u32,
    last_failure: Option<AttemptFailure>,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempt: 0,
            last_failure: None,
        }
    }

    /// Zero-based index of the attempt about to be (or being) issued.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.last_failure.as_ref()
    }

    /// Fold the outcome of the current attempt into the state.
    pub fn record(&mut self, outcome: AttemptOutcome) -> Step {
        let attempts = self.attempt + 1;

        let (failure, retryable) = match outcome {
            AttemptOutcome::Response(code) if (200..300).contains(&code) => {
                return Step::Delivered { status: code };
            }
            AttemptOutcome::Response(code) => {
                (AttemptFailure::Status(code), is_retryable_status(code))
            }
            AttemptOutcome::Transport { message, retryable } => {
                (AttemptFailure::Transport(message), retryable)
            }
        };
        self.last_failure = Some(failure.clone());

        if !retryable {
            return Step::GiveUp(DeliveryError::NonRetryable {
                attempts,
                last: failure,
            });
        }
        if self.attempt >= self.max_retries {
            return Step::GiveUp(DeliveryError::Exhausted {
                attempts,
                last: failure,
            });
        }

        self.attempt += 1;
        Step::Retry {
            attempt: self.attempt,
            after: failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_set_is_exact() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(code), "{code} should be retryable");
        }
        for code in [200, 301, 400, 401, 403, 404, 409, 422, 501, 505] {
            assert!(!is_retryable_status(code), "{code} should not be retryable");
        }
    }

    #[test]
    fn success_on_first_attempt() {
        let mut state = RetryState::new(3);
        assert!(matches!(
            state.record(AttemptOutcome::Response(204)),
            Step::Delivered { status: 204 }
        ));
        assert_eq!(state.attempt(), 0);
    }

    #[test]
    fn retryable_statuses_advance_until_budget_spent() {
        let mut state = RetryState::new(2);

        match state.record(AttemptOutcome::Response(503)) {
            Step::Retry { attempt, after } => {
                assert_eq!(attempt, 1);
                assert_eq!(after, AttemptFailure::Status(503));
            }
            other => panic!("expected retry, got {other:?}"),
        }
        assert!(matches!(
            state.record(AttemptOutcome::Response(429)),
            Step::Retry { attempt: 2, .. }
        ));
        match state.record(AttemptOutcome::Response(502)) {
            Step::GiveUp(DeliveryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, AttemptFailure::Status(502));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn non_retryable_status_stops_immediately() {
        let mut state = RetryState::new(5);
        match state.record(AttemptOutcome::Response(400)) {
            Step::GiveUp(DeliveryError::NonRetryable { attempts, last }) => {
                assert_eq!(attempts, 1);
                assert_eq!(last, AttemptFailure::Status(400));
            }
            other => panic!("expected non-retryable, got {other:?}"),
        }
    }

    #[test]
    fn transport_errors_follow_their_classification() {
        let mut state = RetryState::new(1);
        assert!(matches!(
            state.record(AttemptOutcome::Transport {
                message: "connection refused".into(),
                retryable: true,
            }),
            Step::Retry { attempt: 1, .. }
        ));
        match state.record(AttemptOutcome::Transport {
            message: "builder error".into(),
            retryable: false,
        }) {
            Step::GiveUp(DeliveryError::NonRetryable { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected non-retryable, got {other:?}"),
        }
        assert!(matches!(
            state.last_failure(),
            Some(AttemptFailure::Transport(msg)) if msg == "builder error"
        ));
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let mut state = RetryState::new(0);
        assert!(matches!(
            state.record(AttemptOutcome::Response(500)),
            Step::GiveUp(DeliveryError::Exhausted { attempts: 1, .. })
        ));
    }
}
