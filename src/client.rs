//! CaptureKit client: request executor and public operations.
//!
//! The [`Client`] type is the main entry point. Every operation goes through
//! the same executor, which composes the request, runs each attempt under the
//! per-attempt timeout, records rate limit headers, classifies failures and
//! retries transient ones with backoff.

use crate::{
    config::{ClientOptions, ResolvedConfig},
    metadata::{RequestMetadata, ResponseShape},
    rate_limit::RateLimit,
    retry::RetryPolicy,
    transport::{HttpRequest, HttpResponse, Transport, TransportError},
    types::{CaptureOptions, Health, Screenshot, StoredScreenshot, Usage},
    classify, Error, Response, Result,
};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("capturekit-rust/", env!("CARGO_PKG_VERSION"));

const SCREENSHOT_PATH: &str = "/v1/screenshot";
const USAGE_PATH: &str = "/v1/usage";
const HEALTH_PATH: &str = "/health";

/// A client for the CaptureKit screenshot API.
///
/// Cloning is cheap and clones share configuration, transport and the
/// last observed rate limit.
///
/// # Examples
///
/// ```no_run
/// use capturekit::{CaptureOptions, Client, ImageFormat};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), capturekit::Error> {
/// let client = Client::builder()
///     .api_key("ck_live_123")
///     .timeout(Duration::from_secs(30))
///     .max_retries(3)
///     .build()?;
///
/// let options = CaptureOptions::new("https://example.com").format(ImageFormat::Png);
/// let png = client.capture_bytes(&options).await?;
/// println!("captured {} bytes in {:?}", png.data.len(), png.latency);
///
/// let stored = client.capture_and_store(&options).await?;
/// println!("stored at {} until {}", stored.data.url, stored.data.expires_at);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ResolvedConfig,
    authorization: HeaderValue,
    retry_policy: RetryPolicy,
    // Last write wins across concurrent calls.
    last_rate_limit: RwLock<Option<RateLimit>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.config.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.inner.config.timeout)
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}

impl Client {
    /// Creates a client from an API key or a full [`ClientOptions`].
    ///
    /// # Errors
    ///
    /// Fails before any network activity if the API key is empty or not a
    /// valid header value, the base URL is invalid, or no transport is
    /// available.
    ///
    /// # Examples
    ///
    /// ```
    /// use capturekit::Client;
    ///
    /// assert!(Client::new("").is_err());
    /// ```
    pub fn new(options: impl Into<ClientOptions>) -> Result<Self> {
        let config = options.into().resolve()?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::generic("credential contains characters not allowed in a header"))?;
        authorization.set_sensitive(true);

        let retry_policy = RetryPolicy::new(config.max_retries, config.retry_delay);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                authorization,
                retry_policy,
                last_rate_limit: RwLock::new(None),
            }),
        })
    }

    /// Creates a client configured from `CAPTUREKIT_*` environment variables.
    ///
    /// See [`ClientOptions::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env()?)
    }

    /// Creates a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The effective base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// The rate limit reported by the most recent response on this client
    /// (or any of its clones) that carried all three rate limit headers.
    ///
    /// Concurrent calls overwrite each other; use [`Response::rate_limit`]
    /// for the snapshot of a specific call.
    pub fn last_rate_limit(&self) -> Option<RateLimit> {
        *self
            .inner
            .last_rate_limit
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Captures a screenshot, returning bytes or a stored descriptor depending
    /// on `options.store`.
    pub async fn capture(&self, options: &CaptureOptions) -> Result<Response<Screenshot>> {
        if options.store {
            let response = self.capture_and_store(options).await?;
            Ok(response.map(Screenshot::Stored))
        } else {
            let response = self.capture_bytes(options).await?;
            Ok(response.map(Screenshot::Image))
        }
    }

    /// Captures a screenshot and returns the raw image bytes.
    ///
    /// `options.store` is ignored and sent as `false`.
    pub async fn capture_bytes(&self, options: &CaptureOptions) -> Result<Response<Bytes>> {
        let metadata = capture_metadata(options, false)?.with_shape(ResponseShape::Binary);
        self.call(metadata).await
    }

    /// Captures a screenshot, has the service store it, and returns where.
    ///
    /// `options.store` is ignored and sent as `true`.
    pub async fn capture_and_store(
        &self,
        options: &CaptureOptions,
    ) -> Result<Response<StoredScreenshot>> {
        let metadata = capture_metadata(options, true)?;
        self.call_json(metadata).await
    }

    /// Returns usage for the current billing period.
    pub async fn usage(&self) -> Result<Response<Usage>> {
        self.call_json(RequestMetadata::new(Method::GET, USAGE_PATH))
            .await
    }

    /// Returns the service status.
    pub async fn health(&self) -> Result<Response<Health>> {
        self.call_json(RequestMetadata::new(Method::GET, HEALTH_PATH))
            .await
    }

    /// Runs a request and decodes the JSON response into `T`.
    ///
    /// A success body that does not decode is reported as a generic error
    /// with code `"invalid_response"`; it is not retried.
    pub async fn call_json<T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .call(metadata.with_shape(ResponseShape::Json))
            .await?;

        match serde_json::from_slice::<T>(&response.data) {
            Ok(data) => Ok(response.map(|_| data)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = response.status.as_u16(),
                    "Failed to deserialize response"
                );
                Err(Error::Api {
                    message: format!("Failed to deserialize response: {e}"),
                    status: Some(response.status),
                    code: Some("invalid_response".to_string()),
                })
            }
        }
    }

    /// Runs a request with retries and returns the raw success body.
    ///
    /// This is the executor behind every operation. Each attempt is bounded
    /// by the configured timeout; transient failures are retried up to the
    /// configured budget and only the last error is returned.
    pub async fn call(&self, metadata: RequestMetadata) -> Result<Response<Bytes>> {
        let start_time = Instant::now();
        let request = self.compose(&metadata)?;
        let policy = self.inner.retry_policy;
        let mut last_error = None;

        for attempt in 0..=policy.max_retries {
            let (error, observed) = match self.attempt(request.clone(), attempt).await {
                Ok((response, observed)) if response.status.is_success() => {
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = response.status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt + 1,
                        "Received HTTP response"
                    );
                    return Ok(Response {
                        data: response.body,
                        status: response.status,
                        headers: response.headers,
                        rate_limit: observed,
                        latency,
                        attempts: attempt + 1,
                    });
                }
                Ok((response, observed)) => (failure(&response, observed), observed),
                Err(e) => (e, None),
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %metadata.method,
                path = %metadata.path,
                "Request failed"
            );

            if !policy.should_retry(&error, attempt) {
                return Err(error);
            }

            let delay = policy.delay_for(&error, attempt, observed.as_ref());
            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                rate_limited = observed.is_some() && matches!(error, Error::RateLimited { .. }),
                "Retrying request after delay"
            );
            tokio::time::sleep(delay).await;
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| Error::generic("request failed after retries")))
    }

    /// Builds the transport request shared by every attempt.
    fn compose(&self, metadata: &RequestMetadata) -> Result<HttpRequest> {
        let url = format!("{}{}", self.inner.config.base_url, metadata.path);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, self.inner.authorization.clone());
        headers.insert(header::ACCEPT, metadata.shape.accept());
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        let body = match &metadata.body {
            Some(body) => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                let json = serde_json::to_vec(body)
                    .map_err(|e| Error::generic(format!("Failed to serialize request: {e}")))?;
                Some(Bytes::from(json))
            }
            None => None,
        };

        Ok(HttpRequest {
            method: metadata.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Executes a single attempt under the per-attempt timeout.
    ///
    /// Any response, successful or not, updates the client's rate limit
    /// before it is returned.
    async fn attempt(
        &self,
        request: HttpRequest,
        attempt: usize,
    ) -> Result<(HttpResponse, Option<RateLimit>)> {
        let timeout = self.inner.config.timeout;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let sent = tokio::time::timeout(timeout, self.inner.config.transport.send(request)).await;
        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(from_transport(e, timeout)),
            Err(_elapsed) => return Err(Error::Timeout { timeout }),
        };

        let observed = RateLimit::from_headers(&response.headers);
        if let Some(rate_limit) = observed {
            *self
                .inner
                .last_rate_limit
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(rate_limit);
        }

        Ok((response, observed))
    }
}

/// Classifies a non-2xx response.
fn failure(response: &HttpResponse, observed: Option<RateLimit>) -> Error {
    let status = response.status;
    let body = parse_error_body(&response.body);

    if status.is_client_error() {
        tracing::error!(status = status.as_u16(), "Client error (4xx)");
    } else if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), "Server error (5xx)");
    }

    classify(status, body.as_ref(), observed)
}

/// JSON if possible, else the text as a JSON string, else nothing.
fn parse_error_body(body: &[u8]) -> Option<Value> {
    serde_json::from_slice(body).ok().or_else(|| {
        std::str::from_utf8(body)
            .ok()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Value::String(text.to_string()))
    })
}

fn from_transport(error: TransportError, timeout: Duration) -> Error {
    match error {
        TransportError::TimedOut => Error::Timeout { timeout },
        TransportError::Failed(source) => match source.downcast::<Error>() {
            Ok(typed) => *typed,
            Err(source) => Error::Network { source },
        },
    }
}

fn capture_metadata(options: &CaptureOptions, store: bool) -> Result<RequestMetadata> {
    let mut body = serde_json::to_value(options)
        .map_err(|e| Error::generic(format!("Failed to serialize capture options: {e}")))?;
    body["store"] = Value::Bool(store);
    Ok(RequestMetadata::new(Method::POST, SCREENSHOT_PATH).with_body(body))
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```
/// use capturekit::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .api_key("ck_test_123")
///     .base_url("https://custom/")
///     .timeout(Duration::from_secs(5))
///     .max_retries(0)
///     .build()
///     .unwrap();
///
/// assert_eq!(client.base_url(), "https://custom");
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    options: ClientOptions,
}

impl ClientBuilder {
    /// Creates a builder with default settings and no API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Required.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.options.api_key = api_key.into();
        self
    }

    /// Overrides the service endpoint.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = base_url.into();
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Sets how many times transient failures are retried.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    /// Sets the base delay of the exponential backoff.
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.options.retry_delay = retry_delay;
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// Builds the configured [`Client`].
    ///
    /// # Errors
    ///
    /// See [`Client::new`].
    pub fn build(self) -> Result<Client> {
        Client::new(self.options)
    }
}
