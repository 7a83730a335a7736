//! Root-raised-cosine pulse shaping: transmit interpolator and polyphase
//! receive matched filter.
//!
//! Both ends of the link share one prototype pulse so the cascade forms a
//! Nyquist (raised-cosine) response. The taps are normalized so that a
//! single branch has energy k; the matched cascade then has gain k at the
//! optimum sampling instant, which the receiver removes together with the
//! channel gain through its `0.5 / gamma` output scale.

use num_complex::Complex32;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::config::FrameFormat;

/// Taps per polyphase branch: 2·k·m + 1
pub const BRANCH_TAPS: usize = 2 * FrameFormat::K * FrameFormat::M + 1;

/// Root-raised-cosine impulse response at time `t` in symbol periods,
/// unit symbol rate, rolloff `beta`.
fn rrc_impulse(t: f64, beta: f64) -> f64 {
    let eps = 1e-9;
    if t.abs() < eps {
        return 1.0 - beta + 4.0 * beta / PI;
    }
    // singularity at t = 1/(4 beta)
    if (t.abs() - 1.0 / (4.0 * beta)).abs() < eps {
        let a = PI / (4.0 * beta);
        return beta * FRAC_1_SQRT_2 * ((1.0 + 2.0 / PI) * a.sin() + (1.0 - 2.0 / PI) * a.cos());
    }
    let four_beta_t = 4.0 * beta * t;
    let num = (PI * t * (1.0 - beta)).sin() + four_beta_t * (PI * t * (1.0 + beta)).cos();
    let den = PI * t * (1.0 - four_beta_t * four_beta_t);
    num / den
}

/// The shared 13-tap pulse at k samples/symbol, normalized to energy k.
pub fn rrc_taps() -> [f32; BRANCH_TAPS] {
    branch_taps(0.0)
}

/// One polyphase branch: the prototype sampled with a fractional offset
/// `mu` in [0, 1) samples, sharing the branch-0 energy normalization.
fn branch_taps(mu: f64) -> [f32; BRANCH_TAPS] {
    let k = FrameFormat::K as f64;
    let beta = FrameFormat::BETA as f64;
    let center = (BRANCH_TAPS / 2) as f64;

    let raw = |offset: f64| {
        let mut h = [0.0f64; BRANCH_TAPS];
        for (n, tap) in h.iter_mut().enumerate() {
            *tap = rrc_impulse((n as f64 - center + offset) / k, beta);
        }
        h
    };

    // branch 0 sets the scale for the whole bank
    let h0 = raw(0.0);
    let energy: f64 = h0.iter().map(|&x| x * x).sum();
    let scale = (k / energy).sqrt();

    let h = raw(mu);
    let mut out = [0.0f32; BRANCH_TAPS];
    for (o, &v) in out.iter_mut().zip(h.iter()) {
        *o = (v * scale) as f32;
    }
    out
}

/// Transmit-side polyphase interpolator: one symbol in, k samples out.
#[derive(Debug, Clone)]
pub struct Interp {
    taps: [f32; BRANCH_TAPS],
    window: [Complex32; FrameFormat::M * 2 + 1],
}

impl Interp {
    pub fn new() -> Self {
        Self {
            taps: rrc_taps(),
            window: [Complex32::new(0.0, 0.0); FrameFormat::M * 2 + 1],
        }
    }

    /// Shape one symbol into `FrameFormat::K` output samples.
    pub fn execute(&mut self, symbol: Complex32) -> [Complex32; FrameFormat::K] {
        // newest symbol at index 0
        for i in (1..self.window.len()).rev() {
            self.window[i] = self.window[i - 1];
        }
        self.window[0] = symbol;

        let mut out = [Complex32::new(0.0, 0.0); FrameFormat::K];
        for (phase, sample) in out.iter_mut().enumerate() {
            let mut acc = Complex32::new(0.0, 0.0);
            for (i, &s) in self.window.iter().enumerate() {
                let tap = FrameFormat::K * i + phase;
                if tap < BRANCH_TAPS {
                    acc += s * self.taps[tap];
                }
            }
            *sample = acc;
        }
        out
    }

    pub fn reset(&mut self) {
        self.window = [Complex32::new(0.0, 0.0); FrameFormat::M * 2 + 1];
    }
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-side polyphase matched-filter bank with selectable sub-phase.
#[derive(Debug, Clone)]
pub struct FirPfb {
    branches: Vec<[f32; BRANCH_TAPS]>,
    buf: [Complex32; BRANCH_TAPS],
    pos: usize,
    scale: f32,
}

impl FirPfb {
    pub fn new() -> Self {
        let npfb = FrameFormat::NPFB;
        let branches = (0..npfb)
            .map(|i| branch_taps(i as f64 / npfb as f64))
            .collect();
        Self {
            branches,
            buf: [Complex32::new(0.0, 0.0); BRANCH_TAPS],
            pos: 0,
            scale: 1.0,
        }
    }

    /// Push one input sample into the delay line
    pub fn push(&mut self, sample: Complex32) {
        self.pos = (self.pos + 1) % BRANCH_TAPS;
        self.buf[self.pos] = sample;
    }

    /// Compute the output of sub-filter `index` at the current delay line
    pub fn execute(&self, index: usize) -> Complex32 {
        let taps = &self.branches[index];
        let mut acc = Complex32::new(0.0, 0.0);
        for (lag, &tap) in taps.iter().enumerate() {
            let i = (self.pos + BRANCH_TAPS - lag) % BRANCH_TAPS;
            acc += self.buf[i] * tap;
        }
        acc * self.scale
    }

    /// Set the output amplitude scale (gain compensation)
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Clear the delay line; the scale survives until reprogrammed
    pub fn reset(&mut self) {
        self.buf = [Complex32::new(0.0, 0.0); BRANCH_TAPS];
        self.pos = 0;
    }
}

impl Default for FirPfb {
    fn default() -> Self {
        Self::new()
    }
}
