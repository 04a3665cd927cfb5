//! Client configuration and its resolution into effective settings.

use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Production endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.capturekit.dev";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Default base delay of the exponential backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

const ENV_API_KEY: &str = "CAPTUREKIT_API_KEY";
const ENV_BASE_URL: &str = "CAPTUREKIT_BASE_URL";
const ENV_TIMEOUT_MS: &str = "CAPTUREKIT_TIMEOUT_MS";
const ENV_MAX_RETRIES: &str = "CAPTUREKIT_MAX_RETRIES";
const ENV_RETRY_DELAY_MS: &str = "CAPTUREKIT_RETRY_DELAY_MS";

/// Constructor input for [`crate::Client`].
///
/// A bare API key converts into options with every other field defaulted,
/// so `Client::new("key")` and `Client::new(ClientOptions { .. })` both work.
///
/// # Examples
///
/// ```
/// use capturekit::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions {
///     base_url: "https://staging.capturekit.dev/".to_string(),
///     timeout: Duration::from_secs(10),
///     ..ClientOptions::from("ck_test_123")
/// };
/// assert_eq!(options.max_retries, 2);
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// API key sent as a bearer token. Required.
    pub api_key: String,
    /// Service endpoint; a trailing slash is ignored.
    pub base_url: String,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Retries after the initial attempt for transient failures.
    pub max_retries: usize,
    /// Base delay of the exponential backoff.
    pub retry_delay: Duration,
    /// Transport override; `None` uses [`ReqwestTransport`].
    pub transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            transport: None,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("transport", &self.transport.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl From<&str> for ClientOptions {
    fn from(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Self::default()
        }
    }
}

impl From<String> for ClientOptions {
    fn from(api_key: String) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }
}

impl ClientOptions {
    /// Reads options from the environment.
    ///
    /// - `CAPTUREKIT_API_KEY`: required
    /// - `CAPTUREKIT_BASE_URL`
    /// - `CAPTUREKIT_TIMEOUT_MS`
    /// - `CAPTUREKIT_MAX_RETRIES`
    /// - `CAPTUREKIT_RETRY_DELAY_MS`
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a numeric variable does
    /// not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| Error::generic(format!("missing {ENV_API_KEY} environment variable")))?;

        let mut options = Self::from(api_key);
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            options.base_url = base_url;
        }
        if let Some(ms) = parse_env(&lookup, ENV_TIMEOUT_MS)? {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_env(&lookup, ENV_MAX_RETRIES)? {
            options.max_retries = retries;
        }
        if let Some(ms) = parse_env(&lookup, ENV_RETRY_DELAY_MS)? {
            options.retry_delay = Duration::from_millis(ms);
        }
        Ok(options)
    }

    /// Validates the options and fills in the transport.
    ///
    /// # Errors
    ///
    /// Fails if the API key is empty, the base URL is not an absolute URL,
    /// or no transport was supplied and the default one cannot be built.
    pub(crate) fn resolve(self) -> Result<ResolvedConfig> {
        if self.api_key.trim().is_empty() {
            return Err(Error::generic("credential is required"));
        }

        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::generic(format!("invalid base URL {base_url:?}: {e}")))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(|e| {
                Error::generic(format!(
                    "no HTTP transport available; supply one explicitly ({e})"
                ))
            })?),
        };

        Ok(ResolvedConfig {
            api_key: self.api_key,
            base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            transport,
        })
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::generic(format!("invalid {name}={raw:?}: {e}")))
        })
        .transpose()
}

/// Effective configuration, immutable for the lifetime of a client.
pub(crate) struct ResolvedConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) retry_delay: Duration,
    pub(crate) transport: Arc<dyn Transport>,
}
