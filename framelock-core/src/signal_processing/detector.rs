//! Preamble detection and coarse parameter estimation.
//!
//! The detector slides the known transmit-shaped preamble across the
//! incoming sample stream. The 128-sample cross-correlation is computed in
//! eight 16-sample segments that are combined non-coherently, so a carrier
//! offset of several hundredths of a radian per sample shortens the peak
//! only marginally instead of collapsing it. Once the normalized metric
//! rises above threshold and then falls past its maximum, the peak window
//! yields the full coarse estimate set: carrier frequency from the phase
//! ramp across segments, carrier phase and channel gain from the derotated
//! coherent sum, and fractional timing from a parabolic fit of the metric.
//!
//! Samples keep arriving while the decision is pending, so the detector
//! retains everything from the aligned frame start onward in a ring and
//! hands the run back to the caller, who must replay it through the
//! receive chain before consuming new input.

use num_complex::Complex32;

use crate::config::FrameFormat;
use crate::msequence::pn_preamble;
use crate::signal_processing::filters::Interp;

/// Length of the shaped preamble reference in samples
const REF_LEN: usize = FrameFormat::PREAMBLE_LEN * FrameFormat::K;

/// Correlation segments combined non-coherently
const NUM_SEG: usize = 8;
const SEG_LEN: usize = REF_LEN / NUM_SEG;

/// History ring capacity; must exceed the reference length plus the
/// detection confirmation lag
const RING_LEN: usize = 256;
const RING_MASK: u64 = (RING_LEN - 1) as u64;

/// Samples past the metric maximum before the peak is declared final
const CONFIRM_LAG: u64 = 2;

/// Coarse estimates produced once per frame at detection time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoarseEstimates {
    /// Fractional timing offset, samples
    pub tau: f32,
    /// Channel gain, linear amplitude
    pub gamma: f32,
    /// Carrier frequency offset, radians/sample
    pub dphi: f32,
    /// Carrier phase at the start of the replay buffer, radians
    pub phi: f32,
}

/// Streaming preamble correlator.
pub struct PreambleDetector {
    reference: Vec<Complex32>,
    ref_energy: f32,
    threshold: f32,

    ring: Vec<Complex32>,
    count: u64,
    window_energy: f64,

    tracking: bool,
    prev_metric: f32,
    best_metric: f32,
    best_count: u64,
    best_segments: [Complex32; NUM_SEG],
    metric_before_best: f32,
    metric_after_best: f32,

    estimates: CoarseEstimates,
    buffered: Vec<Complex32>,
}

impl PreambleDetector {
    pub fn new(threshold: f32) -> Self {
        // the reference is the transmitter's own shaping of the p/n
        // symbols, so a clean frame correlates to exactly unity
        let mut interp = Interp::new();
        let mut reference = Vec::with_capacity(REF_LEN);
        for &symbol in &pn_preamble() {
            reference.extend(interp.execute(symbol));
        }
        let ref_energy: f32 = reference.iter().map(|s| s.norm_sqr()).sum();

        Self {
            reference,
            ref_energy,
            threshold,
            ring: vec![Complex32::new(0.0, 0.0); RING_LEN],
            count: 0,
            window_energy: 0.0,
            tracking: false,
            prev_metric: 0.0,
            best_metric: 0.0,
            best_count: 0,
            best_segments: [Complex32::new(0.0, 0.0); NUM_SEG],
            metric_before_best: 0.0,
            metric_after_best: 0.0,
            estimates: CoarseEstimates::default(),
            buffered: Vec::with_capacity(RING_LEN),
        }
    }

    /// Push one sample. Returns true when a preamble has been found; the
    /// caller must then read [`Self::estimates`] and replay every sample
    /// in [`Self::buffered`] through the receive chain before feeding new
    /// input.
    pub fn execute(&mut self, sample: Complex32) -> bool {
        self.ring[(self.count & RING_MASK) as usize] = sample;
        self.count += 1;
        self.window_energy += f64::from(sample.norm_sqr());
        if self.count > REF_LEN as u64 {
            let leaving = self.ring[((self.count - 1 - REF_LEN as u64) & RING_MASK) as usize];
            self.window_energy -= f64::from(leaving.norm_sqr());
        }
        if self.count < REF_LEN as u64 {
            return false;
        }

        let segments = self.correlate();
        let noncoherent: f32 = segments.iter().map(|c| c.norm()).sum();
        let metric =
            noncoherent * noncoherent / (self.ref_energy * self.window_energy as f32 + 1e-20);

        let mut detected = false;
        if !self.tracking {
            if metric > self.threshold {
                self.tracking = true;
                self.metric_before_best = self.prev_metric;
                self.best_metric = metric;
                self.best_count = self.count;
                self.best_segments = segments;
                self.metric_after_best = 0.0;
            }
        } else if metric > self.best_metric {
            self.metric_before_best = self.prev_metric;
            self.best_metric = metric;
            self.best_count = self.count;
            self.best_segments = segments;
            self.metric_after_best = 0.0;
        } else {
            if self.count == self.best_count + 1 {
                self.metric_after_best = metric;
            }
            if self.count - self.best_count >= CONFIRM_LAG {
                self.finalize();
                detected = true;
            }
        }

        self.prev_metric = metric;
        detected
    }

    /// Segment correlations over the most recent `REF_LEN` samples
    fn correlate(&self) -> [Complex32; NUM_SEG] {
        let start = self.count - REF_LEN as u64;
        let mut segments = [Complex32::new(0.0, 0.0); NUM_SEG];
        for (s, seg) in segments.iter_mut().enumerate() {
            let mut acc = Complex32::new(0.0, 0.0);
            for i in 0..SEG_LEN {
                let n = s * SEG_LEN + i;
                let x = self.ring[((start + n as u64) & RING_MASK) as usize];
                acc += self.reference[n].conj() * x;
            }
            *seg = acc;
        }
        segments
    }

    /// Turn the peak window into coarse estimates and the replay buffer
    fn finalize(&mut self) {
        let segments = &self.best_segments;

        // carrier frequency: phase advance between adjacent segments
        let mut ramp = Complex32::new(0.0, 0.0);
        for s in 0..NUM_SEG - 1 {
            ramp += segments[s + 1] * segments[s].conj();
        }
        let dphi = ramp.arg() / SEG_LEN as f32;

        // carrier phase and gain: coherent sum with the ramp removed,
        // each segment referenced to its center
        let mut coherent = Complex32::new(0.0, 0.0);
        for (s, &seg) in segments.iter().enumerate() {
            let center = (s * SEG_LEN) as f32 + (SEG_LEN as f32 - 1.0) / 2.0;
            coherent += seg * Complex32::from_polar(1.0, -dphi * center);
        }
        let phi = coherent.arg();
        let gamma = coherent.norm() / self.ref_energy;

        // fractional timing: parabolic fit around the metric maximum
        let (ml, m0, mr) = (
            self.metric_before_best,
            self.best_metric,
            self.metric_after_best,
        );
        let denom = ml - 2.0 * m0 + mr;
        let tau = if denom.abs() > 1e-9 {
            (0.5 * (ml - mr) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        self.estimates = CoarseEstimates {
            tau,
            gamma,
            dphi,
            phi,
        };

        // every sample from the aligned frame start through the present
        let start = self.best_count - REF_LEN as u64;
        self.buffered.clear();
        for n in start..self.count {
            self.buffered.push(self.ring[(n & RING_MASK) as usize]);
        }

        self.tracking = false;
    }

    /// Coarse estimates from the most recent detection
    pub fn estimates(&self) -> CoarseEstimates {
        self.estimates
    }

    /// Samples accumulated past the frame start that the caller must
    /// replay through the receive chain
    pub fn buffered(&self) -> &[Complex32] {
        &self.buffered
    }

    /// Clear accumulation and re-arm
    pub fn reset(&mut self) {
        self.count = 0;
        self.window_energy = 0.0;
        self.tracking = false;
        self.prev_metric = 0.0;
        self.best_metric = 0.0;
        self.best_count = 0;
        self.metric_before_best = 0.0;
        self.metric_after_best = 0.0;
        self.buffered.clear();
    }
}
