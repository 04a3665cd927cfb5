//! Request and response payloads of the CaptureKit API.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG (the service default).
    Png,
    /// JPEG; honours [`CaptureOptions::quality`].
    Jpeg,
    /// WebP; honours [`CaptureOptions::quality`].
    Webp,
}

/// Page lifecycle event to wait for before capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The `load` event.
    Load,
    /// The `DOMContentLoaded` event.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network activity for a short period.
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// Options for `POST /v1/screenshot`.
///
/// Only `url` is required. `store` is always sent; the `capture_*` methods
/// on [`crate::Client`] set it for you.
///
/// # Examples
///
/// ```
/// use capturekit::{CaptureOptions, ImageFormat, WaitUntil};
///
/// let options = CaptureOptions::new("https://example.com")
///     .format(ImageFormat::Jpeg)
///     .quality(80)
///     .viewport(1280, 720)
///     .full_page(true)
///     .wait_until(WaitUntil::NetworkIdle);
///
/// let body = serde_json::to_value(&options).unwrap();
/// assert_eq!(body["format"], "jpeg");
/// assert_eq!(body["wait_until"], "networkidle");
/// assert_eq!(body["store"], false);
/// assert!(body.get("wait_for_selector").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Page to capture.
    pub url: String,
    /// Output image format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    /// Compression quality, 1-100, for lossy formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Viewport width in CSS pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Viewport height in CSS pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Capture the whole scrollable page instead of the viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,
    /// Lifecycle event to wait for before capturing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<WaitUntil>,
    /// CSS selector that must appear before capturing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    /// Extra delay before capturing, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_timeout: Option<u64>,
    /// Device pixel ratio, e.g. `2.0` for retina output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_scale_factor: Option<f64>,
    /// Store the image and return a [`StoredScreenshot`] instead of the bytes.
    #[serde(default)]
    pub store: bool,
}

impl CaptureOptions {
    /// Options capturing `url` with service defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            quality: None,
            width: None,
            height: None,
            full_page: None,
            wait_until: None,
            wait_for_selector: None,
            wait_for_timeout: None,
            device_scale_factor: None,
            store: false,
        }
    }

    /// Sets the output format.
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the compression quality (1-100) for JPEG and WebP.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Sets both viewport dimensions.
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Captures the full scrollable page when `true`.
    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = Some(full_page);
        self
    }

    /// Waits for `event` before capturing.
    pub fn wait_until(mut self, event: WaitUntil) -> Self {
        self.wait_until = Some(event);
        self
    }

    /// Waits for `selector` to appear before capturing.
    pub fn wait_for_selector(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    /// Waits an extra `millis` milliseconds before capturing.
    pub fn wait_for_timeout(mut self, millis: u64) -> Self {
        self.wait_for_timeout = Some(millis);
        self
    }

    /// Sets the device pixel ratio.
    pub fn device_scale_factor(mut self, factor: f64) -> Self {
        self.device_scale_factor = Some(factor);
        self
    }

    /// Asks the service to store the image instead of returning it.
    pub fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }
}

/// Descriptor of a screenshot stored by the service (`store: true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredScreenshot {
    /// Public URL of the stored image.
    pub url: String,
    /// RFC 3339 timestamp after which `url` stops working.
    pub expires_at: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Size of the stored file.
    pub size_bytes: u64,
}

/// Result of [`crate::Client::capture`], shaped by the request's `store` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screenshot {
    /// The raw image (`store: false`).
    Image(Bytes),
    /// Where the image was stored (`store: true`).
    Stored(StoredScreenshot),
}

impl Screenshot {
    /// The image bytes, if the screenshot was not stored.
    pub fn as_image(&self) -> Option<&Bytes> {
        match self {
            Screenshot::Image(bytes) => Some(bytes),
            Screenshot::Stored(_) => None,
        }
    }

    /// The stored descriptor, if the screenshot was stored.
    pub fn as_stored(&self) -> Option<&StoredScreenshot> {
        match self {
            Screenshot::Stored(stored) => Some(stored),
            Screenshot::Image(_) => None,
        }
    }
}

/// Account usage for the current billing period (`GET /v1/usage`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Billing period label, e.g. `"2024-01"`.
    pub period: String,
    /// Screenshots taken this period.
    pub screenshots_used: u64,
    /// Screenshots allowed per period.
    pub screenshots_limit: u64,
    /// Bytes currently held in storage.
    pub storage_used_bytes: u64,
}

/// Service status reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Fully operational.
    Ok,
    /// Serving requests with reduced capacity or errors.
    Degraded,
    /// Not serving requests.
    Down,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Overall status.
    pub status: HealthStatus,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
