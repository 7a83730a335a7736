//! Pilot symbol insertion and pilot-assisted residual carrier recovery.
//!
//! The transmitter leads every block of 20 data symbols with one known
//! QPSK pilot drawn from an m-sequence, giving 30 pilots across the
//! 630-symbol payload. After the coarse carrier correction the receiver
//! still carries a small residual frequency and phase. The synchronizer
//! measures both against the pilots (a zero-padded FFT across the pilot
//! errors gives a coarse frequency bin, an adjacent-pilot phase slope
//! refines it) and derotates and renormalizes the data symbols.

use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::config::FrameFormat;
use crate::msequence::MSequence;
use crate::utils::qpsk_symbol;

/// FFT length for the residual-frequency search across the pilots
const NFFT: usize = 64;

/// The fixed pilot sequence shared by generator and synchronizer.
fn pilot_sequence() -> Vec<Complex32> {
    let mut ms = MSequence::pilot();
    (0..FrameFormat::NUM_PILOTS)
        .map(|_| qpsk_symbol(ms.next_bit(), ms.next_bit()))
        .collect()
}

/// Transmit-side pilot insertion: 600 data symbols in, 630 out.
pub struct PilotGen {
    pilots: Vec<Complex32>,
}

impl PilotGen {
    pub fn new() -> Self {
        Self {
            pilots: pilot_sequence(),
        }
    }

    /// Payload length including pilots
    pub fn frame_len(&self) -> usize {
        FrameFormat::PAYLOAD_SYMS
    }

    /// Interleave pilots into a data-symbol block, appending the
    /// 630-symbol payload to `out`.
    pub fn execute(&self, data: &[Complex32], out: &mut Vec<Complex32>) {
        assert_eq!(data.len(), FrameFormat::DATA_SYMS, "data symbol count");
        let mut data_iter = data.iter();
        for (p, &pilot) in self.pilots.iter().enumerate() {
            out.push(pilot);
            let block = (FrameFormat::PILOT_SPACING - 1).min(
                FrameFormat::DATA_SYMS - p * (FrameFormat::PILOT_SPACING - 1),
            );
            for _ in 0..block {
                out.push(*data_iter.next().expect("data symbols exhausted"));
            }
        }
    }
}

impl Default for PilotGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-side pilot synchronizer: 630 received symbols in, 600
/// derotated data symbols out.
pub struct PilotSync {
    pilots: Vec<Complex32>,
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex32>,
    errors: Vec<Complex32>,
    /// Residual frequency from the last frame, radians/symbol
    dphi: f32,
    /// Residual phase from the last frame, radians
    phi: f32,
    /// Residual gain from the last frame, linear
    gain: f32,
}

impl PilotSync {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            pilots: pilot_sequence(),
            fft: planner.plan_fft_forward(NFFT),
            fft_buf: vec![Complex32::new(0.0, 0.0); NFFT],
            errors: Vec::with_capacity(FrameFormat::NUM_PILOTS),
            dphi: 0.0,
            phi: 0.0,
            gain: 1.0,
        }
    }

    /// Payload length including pilots
    pub fn frame_len(&self) -> usize {
        FrameFormat::PAYLOAD_SYMS
    }

    /// Residual frequency measured on the last frame, radians/symbol
    pub fn dphi(&self) -> f32 {
        self.dphi
    }

    /// Recover the data symbols from a full received payload, appending
    /// the 600 corrected symbols to `out`.
    pub fn execute(&mut self, received: &[Complex32], out: &mut Vec<Complex32>) {
        assert_eq!(
            received.len(),
            FrameFormat::PAYLOAD_SYMS,
            "payload symbol count"
        );

        // phase error at each pilot position
        self.errors.clear();
        for (p, &pilot) in self.pilots.iter().enumerate() {
            let rx = received[p * FrameFormat::PILOT_SPACING];
            self.errors.push(rx * pilot.conj());
        }

        // coarse residual frequency: strongest FFT bin of the error
        // sequence, one bin = 2π/NFFT radians per pilot interval
        for slot in self.fft_buf.iter_mut() {
            *slot = Complex32::new(0.0, 0.0);
        }
        self.fft_buf[..self.errors.len()].copy_from_slice(&self.errors);
        self.fft.process(&mut self.fft_buf);
        let peak = self
            .fft_buf
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm_sqr().total_cmp(&b.1.norm_sqr()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let bin = if peak > NFFT / 2 {
            peak as f32 - NFFT as f32
        } else {
            peak as f32
        };
        let coarse = std::f32::consts::TAU * bin / NFFT as f32;

        // fine refinement: average phase step between adjacent pilots
        let rotate = Complex32::from_polar(1.0, -coarse);
        let mut slope = Complex32::new(0.0, 0.0);
        for pair in self.errors.windows(2) {
            slope += pair[1] * pair[0].conj() * rotate;
        }
        let per_pilot = coarse + slope.arg();
        self.dphi = per_pilot / FrameFormat::PILOT_SPACING as f32;

        // residual phase and gain at the first payload symbol
        let mut reference = Complex32::new(0.0, 0.0);
        for (p, &e) in self.errors.iter().enumerate() {
            reference += e * Complex32::from_polar(1.0, -per_pilot * p as f32);
        }
        self.phi = reference.arg();
        self.gain = (reference.norm() / FrameFormat::NUM_PILOTS as f32).max(1e-12);

        // derotate and renormalize the data symbols
        for (i, &rx) in received.iter().enumerate() {
            if i % FrameFormat::PILOT_SPACING == 0 {
                continue;
            }
            let correction =
                Complex32::from_polar(1.0 / self.gain, -(self.phi + self.dphi * i as f32));
            out.push(rx * correction);
        }
    }
}

impl Default for PilotSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_data(seed: u64) -> Vec<Complex32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..FrameFormat::DATA_SYMS)
            .map(|_| qpsk_symbol(rng.gen_range(0..2), rng.gen_range(0..2)))
            .collect()
    }

    #[test]
    fn generator_layout() {
        let gen = PilotGen::new();
        assert_eq!(gen.frame_len(), 630);

        let data = random_data(1);
        let mut payload = Vec::new();
        gen.execute(&data, &mut payload);
        assert_eq!(payload.len(), 630);

        // data symbols pass through in order between the pilots
        let recovered: Vec<Complex32> = payload
            .iter()
            .enumerate()
            .filter(|(i, _)| i % FrameFormat::PILOT_SPACING != 0)
            .map(|(_, &s)| s)
            .collect();
        assert_eq!(recovered, data);
    }

    #[test]
    fn clean_payload_passes_through() {
        let gen = PilotGen::new();
        let mut sync = PilotSync::new();

        let data = random_data(2);
        let mut payload = Vec::new();
        gen.execute(&data, &mut payload);

        let mut recovered = Vec::new();
        sync.execute(&payload, &mut recovered);
        assert_eq!(recovered.len(), 600);
        for (got, want) in recovered.iter().zip(data.iter()) {
            assert_relative_eq!(got.re, want.re, epsilon = 1e-3);
            assert_relative_eq!(got.im, want.im, epsilon = 1e-3);
        }
    }

    #[test]
    fn removes_residual_rotation_and_gain() {
        let gen = PilotGen::new();
        let mut sync = PilotSync::new();

        let data = random_data(3);
        let mut payload = Vec::new();
        gen.execute(&data, &mut payload);

        let dphi = 0.004f32;
        let phi = -0.9f32;
        let gain = 0.6f32;
        let impaired: Vec<Complex32> = payload
            .iter()
            .enumerate()
            .map(|(i, &s)| s * Complex32::from_polar(gain, phi + dphi * i as f32))
            .collect();

        let mut recovered = Vec::new();
        sync.execute(&impaired, &mut recovered);
        assert_relative_eq!(sync.dphi(), dphi, epsilon = 2e-4);
        for (got, want) in recovered.iter().zip(data.iter()) {
            assert!((got - want).norm() < 0.08, "{got} vs {want}");
        }
    }

    #[test]
    fn handles_negative_frequency_residual() {
        let gen = PilotGen::new();
        let mut sync = PilotSync::new();

        let data = random_data(4);
        let mut payload = Vec::new();
        gen.execute(&data, &mut payload);

        let dphi = -0.01f32;
        let impaired: Vec<Complex32> = payload
            .iter()
            .enumerate()
            .map(|(i, &s)| s * Complex32::from_polar(1.0, dphi * i as f32))
            .collect();

        let mut recovered = Vec::new();
        sync.execute(&impaired, &mut recovered);
        for (got, want) in recovered.iter().zip(data.iter()) {
            assert!((got - want).norm() < 0.08, "{got} vs {want}");
        }
    }
}
