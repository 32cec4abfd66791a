//! Relay Server Application
//!
//! Accepts WebSocket peers and fans every binary audio frame out to all
//! other connected peers.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::constants::DEFAULT_BIND_ADDR;
use audio_relay::network::{RelayHub, RelayServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting audio relay server");

    // Get bind address from args or use default
    let bind_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let (hub, _hub_task) = RelayHub::spawn();
    let server = RelayServer::bind(&bind_addr, hub).await?;

    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
