//! Response wrapper that carries call metadata alongside the decoded data.

use crate::rate_limit::RateLimit;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful API response.
///
/// Besides the decoded `data`, this records the rate limit reported by the
/// response that succeeded. Unlike [`crate::Client::last_rate_limit`], which
/// is shared by every call on the client, this snapshot belongs to this call
/// alone.
///
/// # Examples
///
/// ```no_run
/// use capturekit::Client;
///
/// # async fn example() -> Result<(), capturekit::Error> {
/// let client = Client::new("ck_live_123")?;
/// let usage = client.usage().await?;
///
/// println!("{} / {}", usage.data.screenshots_used, usage.data.screenshots_limit);
/// println!("took {:?} over {} attempt(s)", usage.latency, usage.attempts);
/// if let Some(rate_limit) = usage.rate_limit {
///     println!("{} requests left", rate_limit.remaining);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The HTTP status code of the successful attempt.
    pub status: StatusCode,

    /// The headers of the successful attempt.
    pub headers: HeaderMap,

    /// Rate limit reported by the successful attempt, if all headers were present.
    pub rate_limit: Option<RateLimit>,

    /// Time from the first attempt until the successful response, including backoff.
    pub latency: Duration,

    /// Number of attempts made; `1` when no retry was needed.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Maps the response data to a different type, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            rate_limit: self.rate_limit,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Consumes the response, returning only the data.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
