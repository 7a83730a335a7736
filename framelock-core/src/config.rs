//! Frame format constants and receiver configuration.
//!
//! The physical-layer parameters are fixed properties of the air interface
//! and are NOT configurable at runtime; transmitter and receiver must agree
//! on every one of them.

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, Result};
use crate::logging::LogConfig;

/// Fixed frame format parameters.
///
/// A frame is a 64-symbol BPSK pseudo-noise preamble followed by 630 QPSK
/// payload symbols: 600 data symbols with one known pilot leading every
/// block of 20, carrying an 8-byte header and a 64-byte payload under a
/// shared CRC-24 and a Golay(24,12) inner code.
pub struct FrameFormat;

impl FrameFormat {
    /// Samples per symbol at the receiver input
    pub const K: usize = 2;

    /// Matched-filter group delay in symbols
    pub const M: usize = 3;

    /// Root-raised-cosine excess bandwidth
    pub const BETA: f32 = 0.5;

    /// Number of sub-filter phases in the polyphase matched-filter bank
    pub const NPFB: usize = 32;

    /// Preamble length in symbols
    pub const PREAMBLE_LEN: usize = 64;

    /// Generator polynomial of the preamble m-sequence (degree 6)
    pub const PN_POLY: u32 = 0x43;

    /// Payload symbols including pilots
    pub const PAYLOAD_SYMS: usize = 630;

    /// Data-bearing payload symbols
    pub const DATA_SYMS: usize = 600;

    /// Pilot spacing: one pilot leads every block of this many symbols
    pub const PILOT_SPACING: usize = 21;

    /// Number of pilot symbols interleaved into the payload
    pub const NUM_PILOTS: usize = 30;

    /// Decoded packet size in bytes
    pub const PACKET_BYTES: usize = 72;

    /// Header portion of the packet
    pub const HEADER_BYTES: usize = 8;

    /// User payload portion of the packet
    pub const PAYLOAD_BYTES: usize = 64;

    /// CRC-24 appended to the packet before FEC encoding
    pub const CRC_BYTES: usize = 3;

    /// Transmitted frame length in samples, including the 2m-symbol flush
    /// that carries the final pulse tails through both filters
    pub const FRAME_LEN: usize =
        (Self::PREAMBLE_LEN + Self::PAYLOAD_SYMS + 2 * Self::M) * Self::K;

    /// Symbols the receiver consumes before the first preamble symbol
    /// appears at the matched-filter output (interpolator plus matched
    /// filter, m symbols each)
    pub const SETTLING_SYMS: usize = 2 * Self::M;
}

/// Runtime-tunable receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Normalized detection threshold in (0, 1); the preamble correlator
    /// reports unity for a perfectly aligned, noiseless frame
    pub threshold: f32,

    /// Capture raw input samples for post-mortem dumps from creation
    pub debug_capture: bool,

    /// Structured logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            debug_capture: false,
            log: LogConfig::default(),
        }
    }
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold >= 1.0 {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.threshold,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_adds_up() {
        // preamble + payload + flush, two samples per symbol
        assert_eq!(FrameFormat::FRAME_LEN, (64 + 630 + 6) * 2);
    }

    #[test]
    fn payload_layout_integrity() {
        // one pilot per block of 20 data symbols
        let blocks = FrameFormat::DATA_SYMS / (FrameFormat::PILOT_SPACING - 1);
        assert_eq!(blocks, FrameFormat::NUM_PILOTS);
        assert_eq!(
            FrameFormat::DATA_SYMS + FrameFormat::NUM_PILOTS,
            FrameFormat::PAYLOAD_SYMS
        );
    }

    #[test]
    fn packet_layout_integrity() {
        assert_eq!(
            FrameFormat::HEADER_BYTES + FrameFormat::PAYLOAD_BYTES,
            FrameFormat::PACKET_BYTES
        );
        // 75 bytes through the rate-1/2 Golay code fills the data symbols exactly
        let coded_bits = (FrameFormat::PACKET_BYTES + FrameFormat::CRC_BYTES) * 8 * 2;
        assert_eq!(coded_bits, FrameFormat::DATA_SYMS * 2);
    }

    #[test]
    fn default_config_validates() {
        assert!(ReceiverConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = ReceiverConfig::default();
        config.threshold = 1.5;
        assert!(config.validate().is_err());
        config.threshold = 0.0;
        assert!(config.validate().is_err());
    }
}
