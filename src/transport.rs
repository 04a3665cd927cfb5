//! Pluggable HTTP transport.
//!
//! The client never talks to the network directly. Each attempt is handed
//! to a [`Transport`] as an [`HttpRequest`] and comes back as an
//! [`HttpResponse`] with the body fully buffered. [`ReqwestTransport`] is
//! the default; tests and unusual runtimes can supply their own.

use crate::error::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

/// One HTTP attempt, fully composed by the client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL.
    pub url: String,
    /// Request headers, including authorization.
    pub headers: HeaderMap,
    /// JSON-encoded body, if any.
    pub body: Option<Bytes>,
}

/// The outcome of an attempt that reached the server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body bytes.
    pub body: Bytes,
}

/// An attempt that failed before a response was received.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The transport gave up waiting, or the request was cancelled.
    #[error("request timed out or was cancelled")]
    TimedOut,

    /// Any other failure: connection refused, DNS, TLS, broken body stream.
    ///
    /// A boxed [`crate::Error`] is passed through to the caller unchanged.
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl TransportError {
    /// Wraps any error as [`TransportError::Failed`].
    pub fn failed(error: impl Into<BoxError>) -> Self {
        TransportError::Failed(error.into())
    }
}

/// Sends a single HTTP request.
///
/// Implementations must not retry or enforce timeouts themselves; the client
/// does both. The returned future may be dropped at any point when the
/// per-attempt timeout elapses.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use capturekit::transport::{HttpRequest, HttpResponse, Transport, TransportError};
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysHealthy;
///
/// #[async_trait]
/// impl Transport for AlwaysHealthy {
///     async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
///         Ok(HttpResponse {
///             status: StatusCode::OK,
///             headers: HeaderMap::new(),
///             body: Bytes::from_static(br#"{"status":"ok"}"#),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and buffers the response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The default transport, backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh connection pool.
    pub fn new() -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self { http_client })
    }

    /// Wraps an existing `reqwest` client, e.g. one configured with a proxy.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(from_reqwest)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn from_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::failed(error)
    }
}
