// tests/delivery_retry.rs

use std::time::{Duration, Instant};

use ghost::delivery::{AttemptFailure, DeliveryClient, DeliveryConfig, DeliveryError, RetryPolicy};
use ghost::types::AuthMode;
use ghost_test_utils::endpoint::{ScriptedEndpoint, unused_url};
use ghost_test_utils::{init_tracing, within_limit};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        multiplier: 2.0,
    }
}

fn client(url: &str, max_retries: u32) -> DeliveryClient {
    DeliveryClient::new(DeliveryConfig::new(url), fast_policy(max_retries)).unwrap()
}

#[tokio::test]
async fn retries_transient_statuses_until_success() {
    init_tracing();
    let endpoint = ScriptedEndpoint::start(&[503, 503], 200).await.unwrap();
    let cancel = CancellationToken::new();

    let outcome = within_limit(client(endpoint.url(), 2).send(&cancel, &json!({"a": 1}))).await;

    assert!(outcome.is_ok(), "{outcome:?}");
    assert_eq!(endpoint.request_count(), 3);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let endpoint = ScriptedEndpoint::always(400).await.unwrap();
    let cancel = CancellationToken::new();

    let err = client(endpoint.url(), 3)
        .send(&cancel, &json!({}))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            DeliveryError::NonRetryable {
                attempts: 1,
                last: AttemptFailure::Status(400)
            }
        ),
        "{err:?}"
    );
    assert_eq!(endpoint.request_count(), 1);
}

#[tokio::test]
async fn retries_are_exhausted_after_max_plus_one_attempts() {
    let endpoint = ScriptedEndpoint::always(502).await.unwrap();
    let cancel = CancellationToken::new();

    let err = within_limit(client(endpoint.url(), 2).send(&cancel, &json!({})))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            DeliveryError::Exhausted {
                attempts: 3,
                last: AttemptFailure::Status(502)
            }
        ),
        "{err:?}"
    );
    assert_eq!(err.to_string(), "webhook failed after 3 attempts: status 502");
    assert_eq!(endpoint.request_count(), 3);
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let endpoint = ScriptedEndpoint::always(503).await.unwrap();
    let cancel = CancellationToken::new();

    let err = client(endpoint.url(), 0)
        .send(&cancel, &json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.attempts(), 1);
    assert_eq!(endpoint.request_count(), 1);
}

#[tokio::test]
async fn every_attempt_carries_identical_body_and_auth() {
    let endpoint = ScriptedEndpoint::start(&[429, 500], 204).await.unwrap();
    let mut config = DeliveryConfig::new(endpoint.url());
    config.method = "put".to_string();
    config.auth = AuthMode::Bearer;
    config.auth_token = Some("s3cret".to_string());
    config.headers = vec![("X-Run".to_string(), "42".to_string())];
    let client = DeliveryClient::new(config, fast_policy(3)).unwrap();
    let cancel = CancellationToken::new();

    let payload = json!({"command": "echo hi", "exit_code": 0});
    within_limit(client.send(&cancel, &payload)).await.unwrap();

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 3);
    let expected = serde_json::to_vec(&payload).unwrap();
    for req in &requests {
        assert_eq!(req.method.as_str(), "PUT");
        assert_eq!(req.body.as_ref(), expected.as_slice());
        assert_eq!(req.headers["authorization"], "Bearer s3cret");
        assert_eq!(req.headers["content-type"], "application/json");
        assert_eq!(req.headers["x-run"], "42");
    }
}

#[tokio::test]
async fn api_key_auth_uses_its_own_header() {
    let endpoint = ScriptedEndpoint::always(200).await.unwrap();
    let mut config = DeliveryConfig::new(endpoint.url());
    config.auth = AuthMode::ApiKey;
    config.auth_token = Some("k-123".to_string());
    let cancel = CancellationToken::new();

    DeliveryClient::new(config, fast_policy(0))
        .unwrap()
        .send(&cancel, &json!({}))
        .await
        .unwrap();

    let req = &endpoint.requests()[0];
    assert_eq!(req.headers["x-api-key"], "k-123");
    assert!(req.headers.get("authorization").is_none());
}

#[tokio::test]
async fn cancel_during_backoff_stops_retrying() {
    init_tracing();
    let endpoint = ScriptedEndpoint::always(503).await.unwrap();
    let policy = RetryPolicy {
        max_retries: 5,
        initial_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(10),
        multiplier: 1.0,
    };
    let client = DeliveryClient::new(DeliveryConfig::new(endpoint.url()), policy).unwrap();
    let cancel = CancellationToken::new();
    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let err = within_limit(client.send(&cancel, &json!({})))
        .await
        .unwrap_err();
    trigger.await.unwrap();

    assert!(err.is_cancelled(), "{err:?}");
    assert_eq!(err.attempts(), 1);
    assert_eq!(endpoint.request_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn overall_timeout_bounds_a_slow_endpoint() {
    let endpoint = ScriptedEndpoint::start_with_delay(&[], 200, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    let mut config = DeliveryConfig::new(endpoint.url());
    config.timeout = Duration::from_millis(300);
    let client = DeliveryClient::new(config, fast_policy(3)).unwrap();
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let err = within_limit(client.send(&cancel, &json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Timeout { attempts: 1 }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn zero_timeout_falls_back_to_default() {
    let endpoint = ScriptedEndpoint::always(200).await.unwrap();
    let mut config = DeliveryConfig::new(endpoint.url());
    config.timeout = Duration::ZERO;
    let client = DeliveryClient::new(config, fast_policy(0)).unwrap();

    let outcome = within_limit(client.send(&CancellationToken::new(), &json!({}))).await;

    assert!(outcome.is_ok(), "{outcome:?}");
    assert_eq!(endpoint.request_count(), 1);
}

#[tokio::test]
async fn blank_method_is_sent_as_post() {
    let endpoint = ScriptedEndpoint::always(200).await.unwrap();
    let mut config = DeliveryConfig::new(endpoint.url());
    config.method = String::new();
    let client = DeliveryClient::new(config, fast_policy(0)).unwrap();

    within_limit(client.send(&CancellationToken::new(), &json!({})))
        .await
        .unwrap();

    assert_eq!(endpoint.requests()[0].method, "POST");
}

#[tokio::test]
async fn connection_refused_is_retried_then_reported() {
    let url = unused_url().await.unwrap();
    let cancel = CancellationToken::new();

    let err = within_limit(client(&url, 1).send(&cancel, &json!({})))
        .await
        .unwrap_err();

    match err {
        DeliveryError::Exhausted {
            attempts: 2,
            last: AttemptFailure::Transport(_),
        } => {}
        other => panic!("expected exhausted transport failure, got {other:?}"),
    }
}
