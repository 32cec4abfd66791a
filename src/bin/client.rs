//! Relay Client Application
//!
//! Captures the default input device, streams it to the relay, and plays
//! back whatever the relay fans out from the other peers.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::audio::{AudioCapture, AudioPlayback};
use audio_relay::config::AppConfig;
use audio_relay::network::client;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load_or_default()?;

    // Get server URL from args or use configured default
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.network.server_url.clone());

    // Audio device setup failing here is fatal: no streaming without both
    // directions of local audio.
    let mut capture = AudioCapture::new(&config.audio).context("failed to create capture")?;
    let mut playback = AudioPlayback::new(&config.audio).context("failed to create playback")?;

    let socket = client::connect(&url)
        .await
        .context("failed to connect to relay")?;

    capture.start().context("failed to start capture")?;
    tracing::info!("Streaming to relay - press Ctrl+C to stop");

    tokio::select! {
        _ = client::stream(socket, capture.queue(), &playback) => {
            // Relay gone; keep local audio alive until the user quits.
            tracing::warn!("relay session ended, continuing locally until Ctrl+C");
            tokio::signal::ctrl_c().await?;
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("Shutting down");

    // Stop producing first; consumers drain their queues and observe
    // closure before the devices are released.
    capture.stop();
    playback.stop();
    Ok(())
}
