//! Error types for CaptureKit API calls.
//!
//! Every failed call produces exactly one [`Error`]. HTTP failures are mapped
//! onto the taxonomy by [`classify`]; transport failures become
//! [`Error::Timeout`] or [`Error::Network`]. Callers can branch on the variant
//! directly or on the fieldless [`ErrorKind`] returned by [`Error::kind`].

use crate::rate_limit::RateLimit;
use crate::retry::is_retryable_status;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Field name → list of validation messages, as reported on a 400.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Boxed error used as the source of [`Error::Network`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for CaptureKit API calls.
///
/// # Examples
///
/// ```no_run
/// use capturekit::{CaptureOptions, Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("ck_live_123")?;
///
/// match client.capture_bytes(&CaptureOptions::new("https://example.com")).await {
///     Ok(response) => println!("{} bytes", response.data.len()),
///     Err(Error::Validation { field_errors: Some(fields), .. }) => {
///         for (field, messages) in fields {
///             eprintln!("{field}: {}", messages.join(", "));
///         }
///     }
///     Err(Error::RateLimited { rate_limit, .. }) => {
///         eprintln!("rate limited until {}", rate_limit.reset);
///     }
///     Err(e) => eprintln!("capture failed: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request was rejected as invalid (HTTP 400).
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
        /// Per-field messages, when the service reported them.
        field_errors: Option<FieldErrors>,
    },

    /// The API key was missing or rejected (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
    },

    /// The service accepted the request but could not render the page (HTTP 422).
    #[error("Screenshot failed: {message}")]
    ScreenshotFailed {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
        /// Machine readable failure code, e.g. `"navigation_timeout"`.
        code: Option<String>,
    },

    /// Too many requests (HTTP 429).
    ///
    /// `rate_limit` is always populated: when the response carried no
    /// rate limit headers it reports nothing remaining and a reset one
    /// minute after the response was received.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
        /// The rate limit in effect when the request was rejected.
        rate_limit: RateLimit,
    },

    /// A single attempt did not complete within the configured timeout.
    #[error("Request timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// The per-attempt timeout that elapsed.
        timeout: Duration,
    },

    /// The transport failed below the HTTP layer (connection refused, DNS, TLS...).
    #[error("Network error: {source}")]
    Network {
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// The service failed (HTTP 5xx).
    #[error("Server error {status}: {message}")]
    Server {
        /// Human readable message from the service.
        message: String,
        /// The HTTP status code.
        status: StatusCode,
    },

    /// Any other failure: unexpected statuses, invalid configuration,
    /// undecodable success bodies.
    #[error("{message}")]
    Api {
        /// Human readable description.
        message: String,
        /// The HTTP status code, if the failure came from a response.
        status: Option<StatusCode>,
        /// Machine readable code, if one applies.
        code: Option<String>,
    },
}

/// The kind of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::Authentication`].
    Authentication,
    /// See [`Error::NotFound`].
    NotFound,
    /// See [`Error::ScreenshotFailed`].
    ScreenshotFailed,
    /// See [`Error::RateLimited`].
    RateLimit,
    /// See [`Error::Timeout`].
    Timeout,
    /// See [`Error::Network`].
    Network,
    /// See [`Error::Server`].
    Server,
    /// See [`Error::Api`].
    Generic,
}

impl Error {
    /// Creates a generic error with no status or code.
    pub fn generic(message: impl Into<String>) -> Self {
        Error::Api {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::ScreenshotFailed { .. } => ErrorKind::ScreenshotFailed,
            Error::RateLimited { .. } => ErrorKind::RateLimit,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Network { .. } => ErrorKind::Network,
            Error::Server { .. } => ErrorKind::Server,
            Error::Api { .. } => ErrorKind::Generic,
        }
    }

    /// Returns the HTTP status code if this error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Validation { status, .. }
            | Error::Authentication { status, .. }
            | Error::NotFound { status, .. }
            | Error::ScreenshotFailed { status, .. }
            | Error::RateLimited { status, .. }
            | Error::Server { status, .. } => Some(*status),
            Error::Api { status, .. } => *status,
            Error::Timeout { .. } | Error::Network { .. } => None,
        }
    }

    /// Returns the machine readable code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::ScreenshotFailed { code, .. } | Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns per-field validation messages, if any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Error::Validation { field_errors, .. } => field_errors.as_ref(),
            _ => None,
        }
    }

    /// Returns the rate limit attached to a [`Error::RateLimited`].
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            Error::RateLimited { rate_limit, .. } => Some(rate_limit),
            _ => None,
        }
    }

    /// Returns `true` if the request that produced this error may be retried.
    ///
    /// Timeouts and network errors are always retryable. Otherwise the
    /// decision depends only on the status code: 408, 429, 500, 502, 503
    /// and 504 are retryable, everything else is not.
    ///
    /// # Examples
    ///
    /// ```
    /// use capturekit::{classify, Error};
    /// use http::StatusCode;
    ///
    /// assert!(classify(StatusCode::BAD_GATEWAY, None, None).is_retryable());
    /// assert!(!classify(StatusCode::UNAUTHORIZED, None, None).is_retryable());
    /// assert!(Error::Timeout { timeout: std::time::Duration::from_secs(1) }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Network { .. } => true,
            _ => self.status().is_some_and(is_retryable_status),
        }
    }
}

/// Maps a failed HTTP response onto the error taxonomy.
///
/// `body` is the response body parsed as JSON, or a JSON string holding the
/// raw text when it was not JSON. `rate_limit` is the snapshot parsed from
/// the response headers, if any. This never fails and performs no I/O.
///
/// # Examples
///
/// ```
/// use capturekit::{classify, ErrorKind};
/// use http::StatusCode;
/// use serde_json::json;
///
/// let body = json!({ "message": "m", "errors": { "url": ["required"] } });
/// let err = classify(StatusCode::BAD_REQUEST, Some(&body), None);
///
/// assert_eq!(err.kind(), ErrorKind::Validation);
/// assert_eq!(err.field_errors().unwrap()["url"], vec!["required".to_string()]);
/// ```
pub fn classify(status: StatusCode, body: Option<&Value>, rate_limit: Option<RateLimit>) -> Error {
    let message = extract_message(body);

    match status.as_u16() {
        400 => Error::Validation {
            message,
            status,
            field_errors: body
                .and_then(|b| b.get("errors"))
                .and_then(|errors| serde_json::from_value(errors.clone()).ok()),
        },
        401 => Error::Authentication { message, status },
        404 => Error::NotFound { message, status },
        422 => Error::ScreenshotFailed {
            message,
            status,
            code: body.and_then(|b| b.get("code")).and_then(code_to_string),
        },
        429 => Error::RateLimited {
            message,
            status,
            rate_limit: rate_limit.unwrap_or_else(RateLimit::exhausted_for_a_minute),
        },
        code if code >= 500 => Error::Server { message, status },
        _ => Error::Api {
            message,
            status: Some(status),
            code: None,
        },
    }
}

fn extract_message(body: Option<&Value>) -> String {
    match body {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| "Unknown error".to_string()),
        _ => "Unknown error".to_string(),
    }
}

fn code_to_string(code: &Value) -> Option<String> {
    match code {
        Value::Null => None,
        Value::String(code) => Some(code.clone()),
        other => Some(other.to_string()),
    }
}

/// A specialized `Result` type for CaptureKit API calls.
pub type Result<T> = std::result::Result<T, Error>;
