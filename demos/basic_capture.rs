//! Basic usage: check health, capture a page to disk, store one remotely.
//!
//! Run with: `CAPTUREKIT_API_KEY=... cargo run --example basic_capture`

use capturekit::{CaptureOptions, Client, HealthStatus, ImageFormat, WaitUntil};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("capturekit=info")
        .init();

    let client = Client::from_env()?;

    let health = client.health().await?;
    if health.data.status != HealthStatus::Ok {
        println!(
            "Service is {:?}: {}",
            health.data.status,
            health.data.message.as_deref().unwrap_or("no details")
        );
    }

    let options = CaptureOptions::new("https://www.rust-lang.org")
        .format(ImageFormat::Png)
        .viewport(1440, 900)
        .full_page(true)
        .wait_until(WaitUntil::NetworkIdle);

    let png = client.capture_bytes(&options).await?;
    std::fs::write("rust-lang.png", &png.data)?;
    println!(
        "Wrote rust-lang.png ({} bytes, {} attempt(s), {:?})",
        png.data.len(),
        png.attempts,
        png.latency
    );

    let stored = client.capture_and_store(&options).await?;
    println!(
        "Stored at {} until {} ({}x{}, {} bytes)",
        stored.data.url,
        stored.data.expires_at,
        stored.data.width,
        stored.data.height,
        stored.data.size_bytes
    );

    let usage = client.usage().await?;
    println!(
        "Period {}: {} of {} screenshots used",
        usage.data.period, usage.data.screenshots_used, usage.data.screenshots_limit
    );

    if let Some(rate_limit) = client.last_rate_limit() {
        println!(
            "Rate limit: {}/{} remaining, resets at {}",
            rate_limit.remaining, rate_limit.limit, rate_limit.reset
        );
    }

    Ok(())
}
