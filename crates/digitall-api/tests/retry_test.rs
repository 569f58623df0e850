// Integration tests for `fetch_with_retry` against a wiremock server.
//
// Backoff is shrunk to a few milliseconds; the jitter (< 250ms) still runs
// on the real clock, so attempt counts are kept small.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use digitall_api::{Error, HttpClient, RetryOptions, TransportConfig, fetch_with_retry};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpClient) {
    let server = MockServer::start().await;
    let client = HttpClient::new(&TransportConfig::default()).unwrap();
    (server, client)
}

fn target(server: &MockServer) -> Url {
    Url::parse(&format!("{}/sub/abc", server.uri())).unwrap()
}

fn quick() -> RetryOptions {
    RetryOptions::default()
        .base_delay(Duration::from_millis(5))
        .max_delay(Duration::from_millis(20))
        .timeout(Duration::from_secs(2))
}

// ── Status handling ─────────────────────────────────────────────────

#[tokio::test]
async fn test_success_on_first_attempt() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = fetch_with_retry(&client, &target(&server), &quick()).await.unwrap();
    assert_eq!(resp.status, 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["name"], "alice");
}

#[tokio::test]
async fn test_recovers_after_server_errors() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let resp = fetch_with_retry(&client, &target(&server), &quick().attempts(4))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_non_retryable_status_returned_not_thrown() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .expect(1)
        .mount(&server)
        .await;

    let resp = fetch_with_retry(&client, &target(&server), &quick().attempts(5))
        .await
        .unwrap();
    assert_eq!(resp.status, 404);
    assert_eq!(&resp.body[..], b"missing");
}

#[tokio::test]
async fn test_exhausted_retries_fail_with_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = fetch_with_retry(&client, &target(&server), &quick().attempts(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http { status: 500 }));
    assert_eq!(err.to_string(), "HTTP 500");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resp = fetch_with_retry(&client, &target(&server), &quick()).await.unwrap();
    assert_eq!(resp.status, 200);
}

// ── Timeouts & cancellation ─────────────────────────────────────────

#[tokio::test]
async fn test_slow_attempt_times_out_and_retries() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let opts = quick().attempts(2).timeout(Duration::from_millis(200));
    let resp = fetch_with_retry(&client, &target(&server), &opts).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_external_cancel_stops_without_retry() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let opts = quick().attempts(3).timeout(Duration::from_secs(10)).cancel_on(cancel);
    let err = fetch_with_retry(&client, &target(&server), &opts).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_attempt_hook_counts_calls() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sub/abc"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let seen = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&seen);
    let opts = quick().on_attempt(move |n, prev| {
        assert_eq!(prev.is_some(), n > 1);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = fetch_with_retry(&client, &target(&server), &opts).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}
