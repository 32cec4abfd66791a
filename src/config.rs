//! Configuration loading and defaults
//!
//! Sample rate, channel count and frame size are process-wide settings that
//! every participant must share; the wire frames carry no format metadata.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_BIT_DEPTH, DEFAULT_BUFFER_SIZE, DEFAULT_CHANNELS,
    DEFAULT_SAMPLE_RATE, DEFAULT_SERVER_URL,
};
use crate::error::{Error, Result};

/// PCM format shared by capture, playback and the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per second
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Samples per frame delivered by the device per I/O cycle
    pub buffer_size: u32,
    /// Bits per sample; only 16 is wired end to end
    pub bit_depth: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            bit_depth: DEFAULT_BIT_DEPTH,
        }
    }
}

impl AudioConfig {
    /// Encoded byte length of one frame
    pub fn frame_bytes(&self) -> usize {
        self.buffer_size as usize * 2
    }
}

/// Relay endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the relay server binds to
    pub bind_address: String,
    /// URL the client dials
    pub server_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDR.to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub network: NetworkConfig,
}

impl AppConfig {
    /// Platform config file location, when one can be determined
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "audio-relay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the config file if present, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.audio.bit_depth != 16 {
            return Err(Error::Config(format!(
                "unsupported bit depth {} (only 16-bit PCM)",
                self.audio.bit_depth
            )));
        }
        if self.audio.channels == 0 {
            return Err(Error::Config("channel count must be nonzero".into()));
        }
        if self.audio.buffer_size == 0 {
            return Err(Error::Config("buffer size must be nonzero".into()));
        }
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("sample rate must be nonzero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.frame_bytes(), 2048);
    }

    #[test]
    fn rejects_non_s16_depth() {
        let mut config = AppConfig::default();
        config.audio.bit_depth = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [audio]
            sample_rate = 48000
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.buffer_size, 1024);
        assert_eq!(config.network.bind_address, "0.0.0.0:8080");
    }
}
