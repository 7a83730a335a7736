//! TOML run configuration for the loopback driver.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level CLI configuration, loadable from a TOML file. Every field
/// has a default so a bare `framelock-cli` run works without a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// What to transmit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Message carried in the frame payloads; longer messages are split
    /// into 64-byte chunks across frames
    pub message: String,
    /// Number of frames to transmit (raised automatically if the message
    /// needs more chunks)
    pub frames: u64,
    /// RNG seed for the channel noise
    pub seed: u64,
    /// Idle samples between frames
    pub gap: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            message: "hello from framelock".to_string(),
            frames: 4,
            seed: 1,
            gap: 256,
        }
    }
}

/// Channel impairments applied to the transmit stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// AWGN level; omit for a noiseless run
    pub snr_db: Option<f32>,
    /// Carrier frequency offset, radians/sample
    pub cfo: f32,
    /// Carrier phase offset, radians
    pub phase: f32,
    /// Linear channel gain
    pub gain: f32,
    /// Fractional sample delay
    pub delay: f32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            snr_db: None,
            cfo: 0.0,
            phase: 0.0,
            gain: 1.0,
            delay: 0.0,
        }
    }
}

impl CliConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).wrap_err_with(|| format!("parsing {}", path.display()))
    }
}
