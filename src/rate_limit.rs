//! Rate limit snapshots parsed from `X-RateLimit-*` response headers.
//!
//! The service reports its quota on every response through three headers:
//! `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
//! (a Unix timestamp in seconds). A [`RateLimit`] is only produced when all
//! three are present and parse as integers.

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Header carrying the request quota for the current window.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the number of requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the Unix timestamp (seconds) at which the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// A point-in-time view of the account's rate limit.
///
/// # Examples
///
/// ```
/// use capturekit::RateLimit;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-ratelimit-limit", "100".parse().unwrap());
/// headers.insert("x-ratelimit-remaining", "42".parse().unwrap());
/// headers.insert("x-ratelimit-reset", "1700000000".parse().unwrap());
///
/// let rate_limit = RateLimit::from_headers(&headers).unwrap();
/// assert_eq!(rate_limit.remaining, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Maximum number of requests in the window.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// When the window resets, as Unix seconds.
    pub reset: u64,
}

impl RateLimit {
    /// Parses a snapshot from response headers.
    ///
    /// Returns `None` unless all three headers are present and numeric.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            limit: parse_header(headers, LIMIT_HEADER)?,
            remaining: parse_header(headers, REMAINING_HEADER)?,
            reset: parse_header(headers, RESET_HEADER)?,
        })
    }

    /// The snapshot reported with a 429 that carried no rate limit headers:
    /// nothing remaining, resetting a minute from now.
    pub fn exhausted_for_a_minute() -> Self {
        Self {
            limit: 0,
            remaining: 0,
            reset: unix_now() + 60,
        }
    }

    /// The reset time as a [`SystemTime`], or `None` if the timestamp does
    /// not fit in one.
    pub fn reset_at(&self) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(Duration::from_secs(self.reset))
    }

    /// Time left until the window resets, or zero if it already has.
    ///
    /// An unrepresentable reset time yields [`Duration::MAX`].
    pub fn until_reset(&self) -> Duration {
        match self.reset_at() {
            Some(reset_at) => reset_at
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
            None => Duration::MAX,
        }
    }
}

fn parse_header(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(limit: &'static str, remaining: &'static str, reset: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-RateLimit-Limit", HeaderValue::from_static(limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static(remaining));
        headers.insert("X-RateLimit-Reset", HeaderValue::from_static(reset));
        headers
    }

    #[test]
    fn test_parse_all_three_headers() {
        let rate_limit = RateLimit::from_headers(&headers("100", "99", "1700000000")).unwrap();
        assert_eq!(
            rate_limit,
            RateLimit {
                limit: 100,
                remaining: 99,
                reset: 1_700_000_000,
            }
        );
    }

    #[test]
    fn test_missing_header_yields_none() {
        let mut headers = headers("100", "99", "1700000000");
        headers.remove(REMAINING_HEADER);
        assert!(RateLimit::from_headers(&headers).is_none());
    }

    #[test]
    fn test_non_numeric_header_yields_none() {
        assert!(RateLimit::from_headers(&headers("100", "lots", "1700000000")).is_none());
    }

    #[test]
    fn test_exhausted_snapshot_resets_in_about_a_minute() {
        let rate_limit = RateLimit::exhausted_for_a_minute();
        assert_eq!(rate_limit.limit, 0);
        assert_eq!(rate_limit.remaining, 0);

        let until = rate_limit.until_reset();
        assert!(
            until >= Duration::from_secs(58) && until <= Duration::from_secs(60),
            "expected ~60s until reset, got {:?}",
            until
        );
    }

    #[test]
    fn test_until_reset_in_the_past_is_zero() {
        let rate_limit = RateLimit {
            limit: 10,
            remaining: 0,
            reset: 1,
        };
        assert_eq!(rate_limit.until_reset(), Duration::ZERO);
    }

    #[test]
    fn test_reset_beyond_system_time_range() {
        let rate_limit =
            RateLimit::from_headers(&headers("10", "0", "18446744073709551615")).unwrap();
        assert_eq!(rate_limit.reset, u64::MAX);
        assert!(rate_limit.reset_at().is_none());
        assert_eq!(rate_limit.until_reset(), Duration::MAX);
    }
}
