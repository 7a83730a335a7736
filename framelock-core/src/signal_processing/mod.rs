//! DSP primitives for the receive chain
//!
//! The filter module holds the shared root-raised-cosine pulse, the
//! transmit interpolator and the polyphase matched-filter bank; `nco` is
//! the carrier derotator and `detector` the preamble cross-correlator that
//! bootstraps the tracking loops.

pub mod detector;
pub mod filters;
pub mod nco;

pub use detector::{CoarseEstimates, PreambleDetector};
pub use filters::{rrc_taps, FirPfb, Interp};
pub use nco::Nco;
