//! Framelock error types.
//!
//! Bad signal quality is never an error: a failed CRC is delivered to the
//! frame callback as a valid outcome. The types below cover configuration
//! mistakes and I/O from the diagnostic writers only.

use thiserror::Error;

/// Top-level error type for all framelock operations
#[derive(Debug, Error)]
pub enum FramelockError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid detection threshold: {threshold} (must be in (0, 1))")]
    InvalidThreshold { threshold: f32 },

    #[error("Invalid SNR: {snr_db} dB (must be finite)")]
    InvalidSnr { snr_db: f32 },

    #[error("Invalid fractional delay: {delay} samples (magnitude must be below {max})")]
    InvalidDelay { delay: f32, max: f32 },
}

/// Result type alias for framelock operations
pub type Result<T> = std::result::Result<T, FramelockError>;
