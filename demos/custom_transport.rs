//! Example plugging in a custom transport.
//!
//! The transport below answers every request locally, failing the first
//! attempt with a 503 so the retry path can be observed in the logs.
//!
//! Run with: `cargo run --example custom_transport`

use async_trait::async_trait;
use capturekit::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use capturekit::{Bytes, Client};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FlakyLocalTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for FlakyLocalTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        println!("{} {} (call {})", request.method, request.url, call + 1);

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from(100u64));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(99 - call as u64));
        headers.insert("x-ratelimit-reset", HeaderValue::from(4_102_444_800u64));

        let (status, body) = if call == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, r#"{"error":"warming up"}"#)
        } else {
            (StatusCode::OK, r#"{"status":"ok","message":"all systems go"}"#)
        };

        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("capturekit=debug")
        .init();

    let transport = Arc::new(FlakyLocalTransport::default());
    let client = Client::builder()
        .api_key("ck_local")
        .base_url("https://capturekit.local")
        .retry_delay(Duration::from_millis(200))
        .transport(transport.clone())
        .build()?;

    let health = client.health().await?;
    println!(
        "{:?}: {} after {} attempt(s)",
        health.data.status,
        health.data.message.as_deref().unwrap_or(""),
        health.attempts
    );
    println!("Last rate limit: {:?}", client.last_rate_limit());

    Ok(())
}
