//! # CaptureKit - async client for the CaptureKit screenshot API
//!
//! `capturekit` wraps the CaptureKit HTTP API with typed requests and
//! responses, per-attempt timeouts, rate-limit aware retries and an error
//! type that can be matched on without string parsing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use capturekit::{CaptureOptions, Client, ImageFormat, WaitUntil};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), capturekit::Error> {
//!     let client = Client::new("ck_live_123")?;
//!
//!     let options = CaptureOptions::new("https://example.com")
//!         .format(ImageFormat::Png)
//!         .viewport(1440, 900)
//!         .wait_until(WaitUntil::NetworkIdle);
//!
//!     // Raw image bytes
//!     let png = client.capture_bytes(&options).await?;
//!     println!("{} bytes after {} attempt(s)", png.data.len(), png.attempts);
//!
//!     // Stored by the service, returned as a descriptor
//!     let stored = client.capture_and_store(&options).await?;
//!     println!("{} ({}x{})", stored.data.url, stored.data.width, stored.data.height);
//!
//!     let usage = client.usage().await?;
//!     println!("{} of {} screenshots used", usage.data.screenshots_used, usage.data.screenshots_limit);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! Timeouts, network failures and the statuses 408, 429, 500, 502, 503 and
//! 504 are retried up to `max_retries` times (2 by default). The delay grows
//! exponentially from `retry_delay` with up to 30% jitter, capped at 30
//! seconds. A 429 carrying `X-RateLimit-*` headers instead waits until the
//! window resets, between 1 and 60 seconds. Other failures are returned
//! immediately.
//!
//! ## Logging
//!
//! The client emits [`tracing`] events under the `capturekit` target.
//! Install any subscriber to see them, e.g.
//! `tracing_subscriber::fmt().with_env_filter("capturekit=debug").init()`.

mod client;
mod config;
mod error;
pub mod metadata;
pub mod rate_limit;
mod response;
pub mod retry;
pub mod transport;
mod types;

pub use client::{Client, ClientBuilder};
pub use config::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use error::{classify, BoxError, Error, ErrorKind, FieldErrors, Result};
pub use rate_limit::RateLimit;
pub use response::Response;
pub use retry::RetryPolicy;
pub use types::{
    CaptureOptions, Health, HealthStatus, ImageFormat, Screenshot, StoredScreenshot, Usage,
    WaitUntil,
};

pub use bytes::Bytes;
