//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Branch on the error variant or its kind
//! - Read field level validation messages
//! - Inspect the rate limit attached to a 429
//!
//! Run with: `CAPTUREKIT_API_KEY=... cargo run --example error_handling`

use capturekit::{CaptureOptions, Client, Error, ErrorKind};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("capturekit=debug")
        .init();

    let client = Client::builder()
        .api_key(std::env::var("CAPTUREKIT_API_KEY").unwrap_or_default())
        .timeout(Duration::from_secs(20))
        .max_retries(1)
        .build()?;

    println!("=== Example 1: Invalid request ===");
    match client.capture_bytes(&CaptureOptions::new("not a url")).await {
        Ok(response) => println!("Unexpected success: {} bytes", response.data.len()),
        Err(Error::Validation {
            message,
            field_errors,
            ..
        }) => {
            println!("Validation failed: {message}");
            for (field, messages) in field_errors.unwrap_or_default() {
                println!("  {field}: {}", messages.join("; "));
            }
        }
        Err(e) => println!("Other error: {e}"),
    }
    println!();

    println!("=== Example 2: Page that cannot be rendered ===");
    let options = CaptureOptions::new("https://does-not-exist.invalid").wait_for_timeout(1000);
    match client.capture_bytes(&options).await {
        Ok(response) => println!("Captured {} bytes", response.data.len()),
        Err(Error::ScreenshotFailed { message, code, .. }) => {
            println!("Screenshot failed ({}): {message}", code.as_deref().unwrap_or("no code"));
        }
        Err(e) => println!("Other error: {e}"),
    }
    println!();

    println!("=== Example 3: Dispatching on the kind ===");
    if let Err(e) = client.usage().await {
        match e.kind() {
            ErrorKind::Authentication => println!("Check CAPTUREKIT_API_KEY: {e}"),
            ErrorKind::RateLimit => {
                if let Some(rate_limit) = e.rate_limit() {
                    println!("Rate limited for another {:?}", rate_limit.until_reset());
                }
            }
            ErrorKind::Timeout | ErrorKind::Network | ErrorKind::Server => {
                println!("Transient failure after retries: {e}");
            }
            _ => println!("Request failed: {e} (status {:?})", e.status()),
        }
    }

    Ok(())
}
