//! Executor tests against a scripted in-memory transport.
//!
//! These run on a paused tokio clock so multi-second backoffs and timeouts
//! complete instantly.

use async_trait::async_trait;
use bytes::Bytes;
use capturekit::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use capturekit::{CaptureOptions, Client, Error, ErrorKind, RateLimit};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

enum Step {
    Respond(HttpResponse),
    Fail(TransportError),
    Hang,
}

struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> HttpRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::failed("hung transport woke up"))
            }
            None => Err(TransportError::failed("script exhausted")),
        }
    }
}

fn respond(status: u16, body: &str) -> Step {
    Step::Respond(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        body: Bytes::copy_from_slice(body.as_bytes()),
    })
}

fn respond_with_rate_limit(status: u16, body: &str, limit: u64, remaining: u64, reset: u64) -> Step {
    let mut headers = HeaderMap::new();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
    Step::Respond(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::copy_from_slice(body.as_bytes()),
    })
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn client(transport: Arc<ScriptedTransport>, max_retries: usize) -> Client {
    Client::builder()
        .api_key("ck_test")
        .base_url("https://api.test")
        .max_retries(max_retries)
        .transport(transport)
        .build()
        .unwrap()
}

const HEALTHY: &str = r#"{"status":"ok"}"#;

#[tokio::test(start_paused = true)]
async fn test_retryable_statuses_use_full_budget() {
    for status in [408, 429, 500, 502, 503, 504] {
        let transport = ScriptedTransport::new((0..3).map(|_| respond(status, "{}")));
        let err = client(transport.clone(), 2).health().await.unwrap_err();

        assert_eq!(transport.calls(), 3, "status {status}");
        assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
    }
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_statuses_are_sent_once() {
    for status in [400, 401, 403, 404, 409, 422, 501] {
        let transport = ScriptedTransport::new((0..5).map(|_| respond(status, "{}")));
        let err = client(transport.clone(), 4).health().await.unwrap_err();

        assert_eq!(transport.calls(), 1, "status {status}");
        assert!(!err.is_retryable());
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_sends_once() {
    let transport = ScriptedTransport::new([respond(503, "{}"), respond(200, HEALTHY)]);
    let err = client(transport.clone(), 0).health().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_two_server_errors_with_exponential_backoff() {
    let transport = ScriptedTransport::new([
        respond(500, r#"{"message":"boom"}"#),
        respond(500, r#"{"message":"boom"}"#),
        respond(200, HEALTHY),
    ]);

    let start = Instant::now();
    let response = client(transport.clone(), 2).health().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(transport.calls(), 3);
    assert_eq!(response.attempts, 3);
    // 1000ms then 2000ms, each with up to 30% jitter.
    assert!(
        elapsed >= Duration::from_millis(3000) && elapsed <= Duration::from_millis(3900),
        "unexpected backoff total {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_waits_until_reset() {
    let reset = unix_now() + 30;
    let transport = ScriptedTransport::new([
        respond_with_rate_limit(429, r#"{"message":"slow down"}"#, 10, 0, reset),
        respond(200, HEALTHY),
    ]);

    let start = Instant::now();
    let response = client(transport.clone(), 2).health().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(transport.calls(), 2);
    assert_eq!(response.attempts, 2);
    assert!(
        elapsed >= Duration::from_secs(28) && elapsed <= Duration::from_secs(31),
        "unexpected rate limit wait {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_wait_is_capped_at_a_minute() {
    let reset = unix_now() + 3600;
    let transport = ScriptedTransport::new([
        respond_with_rate_limit(429, "{}", 10, 0, reset),
        respond(200, HEALTHY),
    ]);

    let start = Instant::now();
    client(transport.clone(), 1).health().await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_reset_waits_the_maximum() {
    let transport = ScriptedTransport::new([
        respond_with_rate_limit(429, "{}", 10, 0, u64::MAX),
        respond_with_rate_limit(429, "{}", 10, 0, u64::MAX),
    ]);

    let start = Instant::now();
    let err = client(transport.clone(), 1).health().await.unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(transport.calls(), 2);
    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert_eq!(err.rate_limit().map(|r| r.reset), Some(u64::MAX));
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_without_headers_backs_off_exponentially() {
    let transport = ScriptedTransport::new([respond(429, "{}"), respond(200, HEALTHY)]);

    let start = Instant::now();
    client(transport.clone(), 1).health().await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000) && elapsed <= Duration::from_millis(1300));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_rate_limit_error_carries_snapshot() {
    let reset = unix_now() + 5;
    let transport = ScriptedTransport::new([
        respond_with_rate_limit(429, "Too Many Requests", 50, 0, reset),
        respond_with_rate_limit(429, "Too Many Requests", 50, 0, reset),
    ]);

    let err = client(transport.clone(), 1).usage().await.unwrap_err();

    match err {
        Error::RateLimited {
            message,
            rate_limit,
            ..
        } => {
            assert_eq!(message, "Too Many Requests");
            assert_eq!(
                rate_limit,
                RateLimit {
                    limit: 50,
                    remaining: 0,
                    reset,
                }
            );
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_is_reported_as_timeout() {
    let transport = ScriptedTransport::new([Step::Hang]);
    let client = Client::builder()
        .api_key("ck_test")
        .timeout(Duration::from_secs(5))
        .max_retries(0)
        .transport(transport.clone())
        .build()
        .unwrap();

    match client.health().await {
        Err(Error::Timeout { timeout }) => assert_eq!(timeout, Duration::from_secs(5)),
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_retried() {
    let transport = ScriptedTransport::new([Step::Hang, respond(200, HEALTHY)]);

    let response = client(transport.clone(), 2).health().await.unwrap();

    assert_eq!(response.attempts, 2);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_network_error_is_retried_then_surfaced() {
    let transport = ScriptedTransport::new([
        Step::Fail(TransportError::failed("connection refused")),
        Step::Fail(TransportError::failed("connection reset")),
    ]);

    let err = client(transport.clone(), 1).health().await.unwrap_err();

    assert_eq!(transport.calls(), 2);
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.to_string(), "Network error: connection reset");
}

#[tokio::test(start_paused = true)]
async fn test_transport_reported_timeout() {
    let transport = ScriptedTransport::new([Step::Fail(TransportError::TimedOut)]);
    let err = client(transport, 0).health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_typed_transport_error_passes_through() {
    let typed = Error::Authentication {
        message: "revoked".to_string(),
        status: StatusCode::UNAUTHORIZED,
    };
    let transport = ScriptedTransport::new([Step::Fail(TransportError::failed(typed))]);

    let err = client(transport.clone(), 3).health().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_recorded_on_failure_and_kept_when_headers_missing() {
    let transport = ScriptedTransport::new([
        respond_with_rate_limit(404, r#"{"message":"nope"}"#, 100, 12, 1_700_000_000),
        respond(200, HEALTHY),
    ]);
    let client = client(transport, 2);

    let err = client.usage().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let expected = RateLimit {
        limit: 100,
        remaining: 12,
        reset: 1_700_000_000,
    };
    assert_eq!(client.last_rate_limit(), Some(expected));

    let response = client.health().await.unwrap();
    assert_eq!(response.rate_limit, None);
    assert_eq!(client.last_rate_limit(), Some(expected));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_shared_between_clones() {
    let transport = ScriptedTransport::new([respond_with_rate_limit(200, HEALTHY, 100, 99, 1_800_000_000)]);
    let client = client(transport, 0);
    let clone = client.clone();

    let response = clone.health().await.unwrap();

    assert_eq!(response.rate_limit.map(|r| r.remaining), Some(99));
    assert_eq!(client.last_rate_limit().map(|r| r.remaining), Some(99));
}

#[tokio::test(start_paused = true)]
async fn test_health_request_composition() {
    let transport = ScriptedTransport::new([respond(200, HEALTHY)]);
    let client = Client::builder()
        .api_key("ck_test")
        .base_url("https://custom/")
        .transport(transport.clone())
        .build()
        .unwrap();

    client.health().await.unwrap();

    let request = transport.request(0);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url, "https://custom/health");
    assert_eq!(request.headers["authorization"], "Bearer ck_test");
    assert_eq!(request.headers["accept"], "application/json");
    assert!(request.headers.get("content-type").is_none());
    assert!(request.body.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_capture_request_composition() {
    let transport = ScriptedTransport::new([respond(200, "not json at all {")]);
    let client = client(transport.clone(), 0);

    let options = CaptureOptions::new("https://example.com")
        .viewport(1280, 720)
        .store(true);
    let response = client.capture_bytes(&options).await.unwrap();

    // Binary bodies are returned untouched, even if they are not valid JSON.
    assert_eq!(response.data.as_ref(), b"not json at all {");

    let request = transport.request(0);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "https://api.test/v1/screenshot");
    assert_eq!(request.headers["accept"], "*/*");
    assert_eq!(request.headers["content-type"], "application/json");

    let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
    assert_eq!(
        body,
        json!({ "url": "https://example.com", "width": 1280, "height": 720, "store": false })
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_key_fails_before_any_request() {
    let transport = ScriptedTransport::new([respond(200, HEALTHY)]);
    let result = Client::builder()
        .api_key("")
        .transport(transport.clone())
        .build();

    assert!(result.is_err());
    assert_eq!(transport.calls(), 0);
}
