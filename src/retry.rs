//! Retry eligibility and backoff computation.
//!
//! A failed attempt is retried when it timed out, failed at the network
//! layer, or returned one of [`RETRYABLE_STATUSES`], and the retry budget is
//! not spent. The delay before the next attempt is either the time until the
//! rate limit window resets (for a 429 carrying rate limit headers) or an
//! exponential backoff with jitter.

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use crate::rate_limit::RateLimit;
use crate::Error;
use http::StatusCode;
use rand::Rng;
use std::time::Duration;

/// Statuses worth retrying: request timeout, rate limited and transient
/// server failures.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Upper bound for exponential backoff delays.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Lower bound when waiting for a rate limit window to reset.
pub const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Upper bound when waiting for a rate limit window to reset.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Fraction of the exponential delay added as random jitter, at most.
const JITTER_RATIO: f64 = 0.3;

/// Returns `true` if a response with this status may be retried.
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// How many times to retry and how long to wait in between.
///
/// # Examples
///
/// ```
/// use capturekit::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(100));
///
/// // 100ms * 2^2 = 400ms, plus up to 30% jitter
/// let delay = policy.exponential_delay(2);
/// assert!(delay >= Duration::from_millis(400));
/// assert!(delay <= Duration::from_millis(520));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: usize,
    /// Base delay of the exponential backoff.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy with the given budget and base delay.
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Returns `true` if the failed attempt `attempt` (0-indexed) should be
    /// followed by another one.
    pub fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Computes the delay before the attempt following `attempt`.
    ///
    /// `observed` is the rate limit parsed from the failed response's
    /// headers. A 429 with such a snapshot waits for the window to reset;
    /// everything else, including transport failures, backs off
    /// exponentially.
    pub fn delay_for(&self, error: &Error, attempt: usize, observed: Option<&RateLimit>) -> Duration {
        match (error, observed) {
            (Error::RateLimited { .. }, Some(rate_limit)) => rate_limit_delay(rate_limit),
            _ => self.exponential_delay(attempt),
        }
    }

    /// `base_delay * 2^attempt` plus up to 30% jitter, capped at [`MAX_BACKOFF`].
    pub fn exponential_delay(&self, attempt: usize) -> Duration {
        let exponential = self.base_exponential_delay(attempt);
        let jitter = exponential.mul_f64(rand::thread_rng().gen_range(0.0..=JITTER_RATIO));
        exponential.saturating_add(jitter).min(MAX_BACKOFF)
    }

    fn base_exponential_delay(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        let multiplier = 2u32.saturating_pow(exponent);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Time until the rate limit resets, clamped to 1-60 seconds.
pub fn rate_limit_delay(rate_limit: &RateLimit) -> Duration {
    rate_limit
        .until_reset()
        .clamp(MIN_RATE_LIMIT_WAIT, MAX_RATE_LIMIT_WAIT)
}
