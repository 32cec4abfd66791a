//! Loopback Latency Test
//!
//! Pipes the default input device straight into the default output device
//! and reports loop and write latency every five seconds.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::audio::stats::{shared_metric, spawn_reporter};
use audio_relay::audio::{AudioCapture, AudioPlayback};
use audio_relay::config::AppConfig;

const REPORT_PERIOD: Duration = Duration::from_secs(5);

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

    let mut capture = AudioCapture::new(&config.audio).context("failed to create capture")?;
    let mut playback = AudioPlayback::new(&config.audio).context("failed to create playback")?;

    capture.start().context("failed to start capture")?;

    let loop_metric = shared_metric();
    let write_metric = shared_metric();
    let _loop_reporter = spawn_reporter(loop_metric.clone(), "loop interval", REPORT_PERIOD);
    let _write_reporter = spawn_reporter(write_metric.clone(), "playback write", REPORT_PERIOD);

    tracing::info!("Loopback test started - you should hear your microphone");
    tracing::info!("Press Ctrl+C to stop");

    let queue = capture.queue();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_loop = Instant::now();
    loop {
        tokio::select! {
            frame = queue.pop() => {
                let Some(samples) = frame else { break };
                let write_started = Instant::now();
                playback.write(&samples);
                write_metric.lock().record(write_started.elapsed());
                loop_metric.lock().record(last_loop.elapsed());
                last_loop = Instant::now();
            }
            _ = &mut shutdown => break,
        }
    }

    capture.stop();
    playback.stop();
    tracing::info!("Loopback test stopped");
    Ok(())
}
