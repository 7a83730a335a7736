//! The streaming frame receiver.
//!
//! A push-based transducer over complex baseband samples. The receiver
//! idles in a detection state, sliding the known preamble over the input;
//! a hit programs the carrier and gain corrections from the detector's
//! coarse estimates and the machine advances through preamble and payload
//! reception one matched-filter symbol at a time. After 630 payload
//! symbols the pilots strip the residual carrier, the packet codec
//! recovers the bytes, and the frame is handed to the caller's callback
//! before the machine re-arms.
//!
//! Everything runs on the caller's thread; `execute` returns once all
//! supplied samples are consumed, invoking the callback zero or more
//! times along the way.

use std::fmt;
use std::path::Path;

use num_complex::Complex32;

use crate::config::{FrameFormat, ReceiverConfig};
use crate::diagnostics::{DebugTrace, FrameDataStats, FrameStats};
use crate::errors::Result;
use crate::logging::SignalLogger;
use crate::msequence::pn_preamble;
use crate::packet::PacketCodec;
use crate::pilots::PilotSync;
use crate::signal_processing::{CoarseEstimates, FirPfb, Nco, PreambleDetector};

/// One decoded frame. Every reference borrows receiver-owned storage and
/// is valid only for the duration of the callback; copy out anything that
/// must survive into the next frame.
pub struct Frame<'a> {
    /// Decoded header bytes
    pub header: &'a [u8; FrameFormat::HEADER_BYTES],
    /// Header integrity; the header shares the packet CRC, so this always
    /// equals `payload_valid`
    pub header_valid: bool,
    /// Decoded payload bytes
    pub payload: &'a [u8; FrameFormat::PAYLOAD_BYTES],
    /// Payload integrity (CRC result). A failed check is still delivered.
    pub payload_valid: bool,
    /// The recovered data symbols, pilots removed
    pub symbols: &'a [Complex32],
    /// Per-frame statistics
    pub stats: &'a FrameStats,
}

/// User callback invoked once per received frame
pub type FrameCallback = Box<dyn FnMut(Frame<'_>)>;

/// Externally observable receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Searching for a preamble
    Detect,
    /// Receiving preamble symbols
    Preamble,
    /// Accumulating payload symbols
    Payload,
}

/// Internal state with per-state data. Counters exist only in the states
/// that own them, so a stale counter in the wrong state cannot be
/// represented.
enum SyncState {
    Detect,
    RxPreamble { counter: usize },
    RxPayload { counter: usize },
}

/// Streaming fixed-format frame receiver.
pub struct FrameReceiver {
    callback: Option<FrameCallback>,
    state: SyncState,

    detector: PreambleDetector,
    mixer: Nco,
    mf: FirPfb,
    mf_counter: usize,
    pfb_index: usize,
    estimates: CoarseEstimates,

    pilot_sync: PilotSync,
    packet: PacketCodec,

    pn_reference: Vec<Complex32>,
    preamble_rx: Vec<Complex32>,
    payload_rx: Vec<Complex32>,
    payload_syms: Vec<Complex32>,
    replay: Vec<Complex32>,

    header: [u8; FrameFormat::HEADER_BYTES],
    payload: [u8; FrameFormat::PAYLOAD_BYTES],
    framestats: FrameStats,
    datastats: FrameDataStats,

    debug: DebugTrace,
    logger: SignalLogger,
}

impl FrameReceiver {
    /// Create a receiver with default configuration. The callback may be
    /// `None` to run the receiver for its counters and diagnostics only.
    pub fn new(callback: Option<FrameCallback>) -> Self {
        Self::with_config(callback, ReceiverConfig::default())
            .expect("default configuration is valid")
    }

    /// Create a receiver with an explicit configuration.
    pub fn with_config(callback: Option<FrameCallback>, config: ReceiverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            callback,
            state: SyncState::Detect,
            detector: PreambleDetector::new(config.threshold),
            mixer: Nco::new(),
            mf: FirPfb::new(),
            mf_counter: 0,
            pfb_index: 0,
            estimates: CoarseEstimates::default(),
            pilot_sync: PilotSync::new(),
            packet: PacketCodec::new(),
            pn_reference: pn_preamble(),
            preamble_rx: vec![Complex32::new(0.0, 0.0); FrameFormat::PREAMBLE_LEN],
            payload_rx: vec![Complex32::new(0.0, 0.0); FrameFormat::PAYLOAD_SYMS],
            payload_syms: Vec::with_capacity(FrameFormat::DATA_SYMS),
            replay: Vec::with_capacity(256),
            header: [0; FrameFormat::HEADER_BYTES],
            payload: [0; FrameFormat::PAYLOAD_BYTES],
            framestats: FrameStats::default(),
            datastats: FrameDataStats::default(),
            debug: DebugTrace::new(config.debug_capture),
            logger: SignalLogger::new(config.log),
        })
    }

    /// Consume a block of samples in order. The callback fires from
    /// inside this call for every frame completed by the block.
    pub fn execute(&mut self, samples: &[Complex32]) {
        for &sample in samples {
            self.execute_sample(sample);
        }
    }

    /// Current receiver state
    pub fn status(&self) -> SyncStatus {
        match self.state {
            SyncState::Detect => SyncStatus::Detect,
            SyncState::RxPreamble { .. } => SyncStatus::Preamble,
            SyncState::RxPayload { .. } => SyncStatus::Payload,
        }
    }

    /// Coarse estimates from the most recent detection
    pub fn estimates(&self) -> CoarseEstimates {
        self.estimates
    }

    /// Cumulative counters across the receiver's lifetime
    pub fn data_stats(&self) -> FrameDataStats {
        self.datastats
    }

    /// Clear the cumulative counters
    pub fn reset_data_stats(&mut self) {
        self.datastats = FrameDataStats::default();
    }

    /// Structured log of acquisition and decode events
    pub fn logger(&self) -> &SignalLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut SignalLogger {
        &mut self.logger
    }

    /// Abandon any frame in progress and return to detection. Counters
    /// and filter state are cleared; no callback fires.
    pub fn reset(&mut self) {
        self.state = SyncState::Detect;
        self.detector.reset();
        self.mixer.reset();
        self.mf.reset();
        self.mf.set_scale(1.0);
        self.mf_counter = 0;
        self.pfb_index = 0;
        self.estimates = CoarseEstimates::default();
    }

    /// Start capturing raw input for post-mortem dumps. Idempotent, legal
    /// in any state.
    pub fn debug_enable(&mut self) {
        self.debug.enable();
    }

    pub fn debug_disable(&mut self) {
        self.debug.disable();
    }

    /// Write the post-mortem script. Without a prior `debug_enable` this
    /// logs a warning and leaves the filesystem untouched.
    pub fn debug_print(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if !self.debug.is_enabled() {
            self.logger
                .warn("TRACE", "capture not enabled; nothing to write");
            return Ok(());
        }
        self.debug.write_script(
            path.as_ref(),
            &self.pn_reference,
            &self.preamble_rx,
            &self.payload_syms,
        )?;
        Ok(())
    }

    /// Print a state summary to standard output
    pub fn print(&self) {
        println!("{self}");
    }

    fn execute_sample(&mut self, sample: Complex32) {
        self.debug.push(sample);
        match self.state {
            SyncState::Detect => self.handle_detect(sample),
            SyncState::RxPreamble { counter } => self.handle_preamble(sample, counter),
            SyncState::RxPayload { counter } => self.handle_payload(sample, counter),
        }
    }

    /// Feed the detector; on a hit, program the tracking loops from the
    /// coarse estimates and replay the detector's buffered run through
    /// the full receive path. Replay cannot recurse into detection: the
    /// state has already advanced.
    fn handle_detect(&mut self, sample: Complex32) {
        if !self.detector.execute(sample) {
            return;
        }

        let est = self.detector.estimates();
        self.estimates = est;

        // gain compensation; the extra 1/2 removes the matched-filter
        // cascade gain of k
        self.mf.set_scale(0.5 / est.gamma.max(1e-6));
        // fixed sub-filter: the replay is aligned to the nearest sample
        // and the fractional residual stays inside the matched-filter eye
        // TODO: select the branch nearest tau once the negative-offset
        // wrap is worked out
        self.pfb_index = 0;
        self.mixer.set_frequency(est.dphi);
        self.mixer.set_phase(est.phi);

        self.state = SyncState::RxPreamble { counter: 0 };
        self.logger.info(
            "DETECT",
            format!(
                "preamble found: tau={:+.3}, gamma={:.4}, dphi={:+.5}, phi={:+.3}",
                est.tau, est.gamma, est.dphi, est.phi
            ),
        );

        let mut replay = std::mem::take(&mut self.replay);
        replay.clear();
        replay.extend_from_slice(self.detector.buffered());
        for &s in &replay {
            self.execute_sample(s);
        }
        replay.clear();
        self.replay = replay;
    }

    /// Derotate, filter, decimate: one input sample in, possibly one
    /// symbol out. The symbol fires on the first sample of each pair,
    /// which places the detector's sample-aligned replay onto the symbol
    /// grid.
    fn step(&mut self, sample: Complex32) -> Option<Complex32> {
        let v = self.mixer.mix_down(sample);
        self.mixer.step();

        self.mf.push(v);
        let out = self.mf.execute(self.pfb_index);

        self.mf_counter += 1;
        let available = self.mf_counter == 1;
        self.mf_counter %= FrameFormat::K;
        available.then_some(out)
    }

    fn handle_preamble(&mut self, sample: Complex32, counter: usize) {
        let Some(symbol) = self.step(sample) else {
            return;
        };

        // the first 2m symbols are filter settling transients
        if counter >= FrameFormat::SETTLING_SYMS {
            self.preamble_rx[counter - FrameFormat::SETTLING_SYMS] = symbol;
        }

        let next = counter + 1;
        if next == FrameFormat::PREAMBLE_LEN + FrameFormat::SETTLING_SYMS {
            self.state = SyncState::RxPayload { counter: 0 };
            self.logger.debug("PREAMBLE", "preamble complete");
        } else {
            self.state = SyncState::RxPreamble { counter: next };
        }
    }

    fn handle_payload(&mut self, sample: Complex32, counter: usize) {
        let Some(symbol) = self.step(sample) else {
            return;
        };

        self.payload_rx[counter] = symbol;
        let next = counter + 1;
        if next == FrameFormat::PAYLOAD_SYMS {
            self.decode_and_dispatch();
        } else {
            self.state = SyncState::RxPayload { counter: next };
        }
    }

    /// Full payload accumulated: recover the data symbols, decode the
    /// packet, deliver the frame, re-arm.
    fn decode_and_dispatch(&mut self) {
        self.payload_syms.clear();
        self.pilot_sync
            .execute(&self.payload_rx, &mut self.payload_syms);
        self.logger.debug(
            "PILOT",
            format!("residual dphi={:+.5}/sym", self.pilot_sync.dphi()),
        );

        let mut packet = [0u8; FrameFormat::PACKET_BYTES];
        let valid = self.packet.decode(&self.payload_syms, &mut packet);
        self.header
            .copy_from_slice(&packet[..FrameFormat::HEADER_BYTES]);
        self.payload
            .copy_from_slice(&packet[FrameFormat::HEADER_BYTES..]);

        self.framestats = FrameStats {
            rssi: 20.0 * self.estimates.gamma.max(1e-12).log10(),
            cfo: self.mixer.frequency(),
            ..FrameStats::default()
        };

        self.datastats.frames_detected += 1;
        if valid {
            self.datastats.headers_valid += 1;
            self.datastats.payloads_valid += 1;
            self.datastats.bytes_received += FrameFormat::PAYLOAD_BYTES as u64;
        }

        self.logger.info(
            "DECODE",
            format!(
                "frame complete: crc {}, rssi {:+.2} dB",
                if valid { "pass" } else { "FAIL" },
                self.framestats.rssi
            ),
        );

        if let Some(callback) = self.callback.as_mut() {
            callback(Frame {
                header: &self.header,
                header_valid: valid,
                payload: &self.payload,
                payload_valid: valid,
                symbols: &self.payload_syms,
                stats: &self.framestats,
            });
        }

        self.reset();
    }
}

impl fmt::Display for FrameReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "framelock receiver:")?;
        writeln!(f, "  state: {:?}", self.status())?;
        writeln!(
            f,
            "  estimates: tau={:+.3}, gamma={:.4}, dphi={:+.5}, phi={:+.3}",
            self.estimates.tau, self.estimates.gamma, self.estimates.dphi, self.estimates.phi
        )?;
        write!(f, "  totals: {}", self.datastats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FrameGenerator;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn capture() -> (Rc<RefCell<Vec<(Vec<u8>, bool)>>>, FrameCallback) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&frames);
        let callback: FrameCallback = Box::new(move |frame: Frame<'_>| {
            sink.borrow_mut()
                .push((frame.payload.to_vec(), frame.payload_valid));
        });
        (frames, callback)
    }

    #[test]
    fn starts_in_detect() {
        let rx = FrameReceiver::new(None);
        assert_eq!(rx.status(), SyncStatus::Detect);
        assert_eq!(rx.data_stats(), FrameDataStats::default());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ReceiverConfig::default();
        config.threshold = 2.0;
        assert!(FrameReceiver::with_config(None, config).is_err());
    }

    #[test]
    fn clean_frame_reaches_callback() {
        let header = [7u8; 8];
        let payload = {
            let mut p = [0u8; 64];
            for (i, b) in p.iter_mut().enumerate() {
                *b = i as u8;
            }
            p
        };
        let samples = FrameGenerator::new().execute(&header, &payload);

        let (frames, callback) = capture();
        let mut rx = FrameReceiver::new(Some(callback));
        rx.execute(&samples);

        let frames = frames.borrow();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].1);
        assert_eq!(frames[0].0, payload.to_vec());
        assert_eq!(rx.status(), SyncStatus::Detect);
        assert_eq!(rx.data_stats().frames_detected, 1);
    }

    #[test]
    fn external_reset_abandons_frame() {
        let samples = FrameGenerator::new().execute(&[1u8; 8], &[2u8; 64]);

        let (frames, callback) = capture();
        let mut rx = FrameReceiver::new(Some(callback));
        rx.execute(&samples[..900]);
        assert_ne!(rx.status(), SyncStatus::Detect);

        rx.reset();
        assert_eq!(rx.status(), SyncStatus::Detect);
        assert!(frames.borrow().is_empty());

        // a subsequent clean frame still decodes
        rx.execute(&samples);
        assert_eq!(frames.borrow().len(), 1);
        assert!(frames.borrow()[0].1);
    }

    #[test]
    fn debug_print_without_enable_is_a_noop() {
        let mut rx = FrameReceiver::new(None);
        let path = std::env::temp_dir().join("framelock_never_written.py");
        let _ = std::fs::remove_file(&path);
        rx.debug_print(&path).unwrap();
        assert!(!path.exists());
        assert!(!rx.logger().entries_for_subsystem("TRACE").is_empty());
    }

    #[test]
    fn debug_print_writes_script_when_enabled() {
        let samples = FrameGenerator::new().execute(&[3u8; 8], &[4u8; 64]);
        let mut rx = FrameReceiver::new(None);
        rx.debug_enable();
        rx.execute(&samples);

        let path = std::env::temp_dir().join("framelock_capture.py");
        rx.debug_print(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("recovered payload symbols"));
        std::fs::remove_file(&path).unwrap();
    }
}
