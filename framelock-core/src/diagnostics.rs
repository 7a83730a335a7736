//! Per-frame statistics, cumulative counters, and the post-mortem capture.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// Raw input samples retained for post-mortem dumps
pub const DEBUG_CAPTURE_LEN: usize = 1600;

/// Modulation scheme of the payload symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModulationScheme {
    Qpsk,
}

impl fmt::Display for ModulationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModulationScheme::Qpsk => write!(f, "QPSK"),
        }
    }
}

/// Integrity check protecting the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumScheme {
    Crc24,
}

impl fmt::Display for ChecksumScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumScheme::Crc24 => write!(f, "CRC-24"),
        }
    }
}

/// Forward error correction scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FecScheme {
    None,
    Golay2412,
}

impl fmt::Display for FecScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FecScheme::None => write!(f, "none"),
            FecScheme::Golay2412 => write!(f, "Golay(24,12)"),
        }
    }
}

/// Statistics delivered with every decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Error-vector magnitude; reserved, always zero
    pub evm: f32,
    /// Received signal strength from the coarse gain estimate, dB
    pub rssi: f32,
    /// Carrier frequency offset being tracked, radians/sample
    pub cfo: f32,
    /// Modulation of the data symbols
    pub mod_scheme: ModulationScheme,
    /// Bits per data symbol
    pub mod_bps: u8,
    /// Packet integrity check
    pub check: ChecksumScheme,
    /// Outer FEC
    pub fec0: FecScheme,
    /// Inner FEC
    pub fec1: FecScheme,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            evm: 0.0,
            rssi: 0.0,
            cfo: 0.0,
            mod_scheme: ModulationScheme::Qpsk,
            mod_bps: 2,
            check: ChecksumScheme::Crc24,
            fec0: FecScheme::None,
            fec1: FecScheme::Golay2412,
        }
    }
}

/// Cumulative counters across the life of a receiver; survive per-frame
/// resets and are cleared only on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDataStats {
    /// Frames detected and fully received
    pub frames_detected: u64,
    /// Frames whose header passed the integrity check
    pub headers_valid: u64,
    /// Frames whose payload passed the integrity check
    pub payloads_valid: u64,
    /// Payload bytes delivered from valid frames
    pub bytes_received: u64,
}

impl fmt::Display for FrameDataStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames {}, headers valid {}, payloads valid {}, bytes {}",
            self.frames_detected, self.headers_valid, self.payloads_valid, self.bytes_received
        )
    }
}

/// Ring buffer of raw input plus the writer for the post-mortem script.
#[derive(Debug, Clone)]
pub struct DebugTrace {
    enabled: bool,
    ring: VecDeque<Complex32>,
}

impl DebugTrace {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ring: VecDeque::with_capacity(DEBUG_CAPTURE_LEN),
        }
    }

    /// Enabling is idempotent and allowed at any time
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one raw input sample
    pub fn push(&mut self, sample: Complex32) {
        if !self.enabled {
            return;
        }
        if self.ring.len() == DEBUG_CAPTURE_LEN {
            self.ring.pop_front();
        }
        self.ring.push_back(sample);
    }

    pub fn captured(&self) -> usize {
        self.ring.len()
    }

    /// Write a self-contained plotting script with the captured input,
    /// the p/n reference, the received preamble, and the recovered
    /// payload symbols. Output is deterministic for identical input.
    pub fn write_script(
        &self,
        path: &Path,
        pn_reference: &[Complex32],
        preamble_rx: &[Complex32],
        payload_syms: &[Complex32],
    ) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        writeln!(w, "#!/usr/bin/env python3")?;
        writeln!(w, "# framelock receiver capture")?;
        writeln!(w, "import numpy as np")?;
        writeln!(w, "import matplotlib.pyplot as plt")?;
        writeln!(w)?;
        write_array(&mut w, "x", self.ring.iter().copied())?;
        write_array(&mut w, "pn", pn_reference.iter().copied())?;
        write_array(&mut w, "preamble", preamble_rx.iter().copied())?;
        write_array(&mut w, "payload", payload_syms.iter().copied())?;
        writeln!(w)?;
        writeln!(w, "fig, (ax0, ax1, ax2) = plt.subplots(3, 1, figsize=(8, 10))")?;
        writeln!(w, "ax0.plot(np.real(x), label='I')")?;
        writeln!(w, "ax0.plot(np.imag(x), label='Q')")?;
        writeln!(w, "ax0.set_title('raw input')")?;
        writeln!(w, "ax0.legend()")?;
        writeln!(w, "ax1.plot(np.real(preamble), np.imag(preamble), '.')")?;
        writeln!(w, "ax1.set_title('received preamble')")?;
        writeln!(w, "ax1.axis('equal')")?;
        writeln!(w, "ax2.plot(np.real(payload), np.imag(payload), '.')")?;
        writeln!(w, "ax2.set_title('recovered payload symbols')")?;
        writeln!(w, "ax2.axis('equal')")?;
        writeln!(w, "plt.tight_layout()")?;
        writeln!(w, "plt.show()")?;
        w.flush()
    }
}

fn write_array<W: Write>(
    w: &mut W,
    name: &str,
    values: impl Iterator<Item = Complex32>,
) -> std::io::Result<()> {
    write!(w, "{name} = np.array([")?;
    for (i, v) in values.enumerate() {
        if i % 4 == 0 {
            writeln!(w)?;
            write!(w, "    ")?;
        }
        write!(w, "{:.6e}{:+.6e}j, ", v.re, v.im)?;
    }
    writeln!(w, "])")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_match_frame_format() {
        let stats = FrameStats::default();
        assert_eq!(stats.evm, 0.0);
        assert_eq!(stats.mod_bps, 2);
        assert_eq!(stats.mod_scheme, ModulationScheme::Qpsk);
        assert_eq!(stats.fec1, FecScheme::Golay2412);
    }

    #[test]
    fn capture_is_bounded() {
        let mut trace = DebugTrace::new(true);
        for n in 0..2 * DEBUG_CAPTURE_LEN {
            trace.push(Complex32::new(n as f32, 0.0));
        }
        assert_eq!(trace.captured(), DEBUG_CAPTURE_LEN);
    }

    #[test]
    fn disabled_capture_records_nothing() {
        let mut trace = DebugTrace::new(false);
        trace.push(Complex32::new(1.0, 1.0));
        assert_eq!(trace.captured(), 0);
        trace.enable();
        trace.enable(); // idempotent
        trace.push(Complex32::new(1.0, 1.0));
        assert_eq!(trace.captured(), 1);
    }

    #[test]
    fn script_output_is_deterministic() {
        let mut trace = DebugTrace::new(true);
        for n in 0..32 {
            trace.push(Complex32::new(n as f32 * 0.1, -(n as f32) * 0.05));
        }
        let pn = vec![Complex32::new(1.0, 0.0); 4];
        let dir = std::env::temp_dir();
        let a = dir.join("framelock_capture_a.py");
        let b = dir.join("framelock_capture_b.py");
        trace.write_script(&a, &pn, &pn, &pn).unwrap();
        trace.write_script(&b, &pn, &pn, &pn).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        let text = std::fs::read_to_string(&a).unwrap();
        assert!(text.contains("import numpy as np"));
        assert!(text.contains("payload = np.array(["));
    }
}
