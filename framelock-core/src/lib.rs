//! Framelock core library
//!
//! A streaming receiver for a fixed-format burst frame: a 64-symbol
//! pseudo-noise preamble followed by 630 QPSK payload symbols (600 data
//! symbols interleaved with pilots) carrying a 72-byte packet protected by
//! a CRC-24 and a Golay(24,12) inner code.
//!
//! The caller pushes complex baseband samples (2 samples/symbol) into a
//! [`FrameReceiver`]; decoded frames are delivered through a callback
//! together with per-frame statistics. The matching transmit side lives in
//! [`FrameGenerator`], and `channel` provides the impairments needed to
//! exercise the receiver end to end.

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod generator;
pub mod logging;
pub mod msequence;
pub mod packet;
pub mod pilots;
pub mod receiver;
pub mod signal_processing;
pub mod utils;

// Canonical entry points
pub use config::{FrameFormat, ReceiverConfig};
pub use diagnostics::{FrameDataStats, FrameStats};
pub use generator::FrameGenerator;
pub use receiver::{Frame, FrameCallback, FrameReceiver, SyncStatus};
