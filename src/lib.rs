//! # Audio Relay
//!
//! Low-latency PCM audio relay over WebSocket for real-time jam sessions.
//!
//! One producing peer streams raw signed 16-bit little-endian samples to a
//! central relay, which fans each frame out to every other connected peer.
//! A separate loopback mode pipes a machine's own capture straight into its
//! own playback for latency testing.
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────── CLIENT A ────────────┐        ┌───────── SERVER ─────────┐
//!  │ Microphone                       │        │                          │
//!  │    │ cpal callback               │        │   ┌──────────────────┐   │
//!  │    ▼                             │   ws   │   │    Relay Hub     │   │
//!  │ capture queue ──► encode ──► send├───────►│──►│  (single-writer  │   │
//!  │                                  │        │   │   control loop)  │   │
//!  │ playback queue ◄── decode ◄─ recv│◄───────┤◄──│                  │   │
//!  │    │ feed thread                 │        │   └───┬──────────┬───┘   │
//!  │    ▼                             │        │       ▼          ▼       │
//!  │ Speakers                         │        │   mailbox B  mailbox C   │
//!  └──────────────────────────────────┘        │       │          │       │
//!                                              │       ▼ ws       ▼ ws    │
//!                                              │   CLIENT B   CLIENT C    │
//!                                              └──────────────────────────┘
//! ```
//!
//! Every stage is decoupled by a fixed-capacity [`queue::BoundedQueue`].
//! Audio queues drop the newest frame on overflow; the hub instead drops the
//! slow peer, so one stalled consumer never delays the rest.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod queue;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio capture and playback
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Default channel count (mono)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Default samples per frame delivered by the audio device
    pub const DEFAULT_BUFFER_SIZE: u32 = 1024;

    /// Default sample bit depth (only s16le is wired end to end)
    pub const DEFAULT_BIT_DEPTH: u16 = 16;

    /// Capacity of every bounded queue: capture, playback, peer mailboxes
    pub const QUEUE_CAPACITY: usize = 100;

    /// Capacity of the hub's inbound command channel
    pub const HUB_CHANNEL_CAPACITY: usize = 256;

    /// Default WebSocket bind address for the relay server
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

    /// Default relay URL dialed by the client
    pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";
}
