//! Channel modeling and impairment simulation.
//!
//! Everything the receiver is expected to survive can be applied to a
//! clean transmit stream here: AWGN at a chosen SNR, carrier frequency and
//! phase offsets, linear gain, and fractional sample delay. All noise is
//! driven by a caller-supplied RNG so runs are reproducible.

use num_complex::Complex32;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

/// RNG used for reproducible channel runs
pub type ChannelRng = ChaCha8Rng;

/// A seeded RNG for deterministic impairment streams.
pub fn channel_rng(seed: u64) -> ChannelRng {
    ChannelRng::seed_from_u64(seed)
}

/// Apply AWGN relative to a nominal unit signal power.
///
/// The transmit chain produces unit average power, so the per-component
/// noise deviation follows directly from the requested SNR.
pub fn apply_awgn<R: Rng>(samples: &[Complex32], snr_db: f32, rng: &mut R) -> Vec<Complex32> {
    let noise_power = 10.0f32.powf(-snr_db / 10.0);
    let sigma = (noise_power / 2.0).sqrt();
    samples
        .iter()
        .map(|&s| {
            let ni: f32 = rng.sample(StandardNormal);
            let nq: f32 = rng.sample(StandardNormal);
            s + Complex32::new(ni * sigma, nq * sigma)
        })
        .collect()
}

/// Rotate a stream by a carrier frequency offset (radians/sample) and an
/// initial phase, starting at `start_index` to keep split streams
/// consistent.
pub fn apply_carrier_offset(
    samples: &[Complex32],
    dphi: f32,
    phi: f32,
    start_index: usize,
) -> Vec<Complex32> {
    samples
        .iter()
        .enumerate()
        .map(|(n, &s)| s * Complex32::from_polar(1.0, phi + dphi * (start_index + n) as f32))
        .collect()
}

/// Scale a stream by a linear gain.
pub fn apply_gain(samples: &[Complex32], gain: f32) -> Vec<Complex32> {
    samples.iter().map(|&s| s * gain).collect()
}

/// Delay a stream by a fractional number of samples using a windowed-sinc
/// interpolator. `delay` may be negative (an advance) and should stay
/// well inside the interpolator half-span of 20 samples.
pub fn apply_fractional_delay(samples: &[Complex32], delay: f32) -> Vec<Complex32> {
    const HALF_SPAN: i64 = 20;

    let taps: Vec<f32> = (-HALF_SPAN..=HALF_SPAN)
        .map(|l| {
            let t = l as f64 - f64::from(delay);
            let sinc = if t.abs() < 1e-9 {
                1.0
            } else {
                (PI * t).sin() / (PI * t)
            };
            // Hann window over the interpolator span
            let w = 0.5 * (1.0 + (PI * l as f64 / (HALF_SPAN as f64 + 1.0)).cos());
            (sinc * w) as f32
        })
        .collect();

    (0..samples.len())
        .map(|n| {
            let mut acc = Complex32::new(0.0, 0.0);
            for (i, &tap) in taps.iter().enumerate() {
                let idx = n as i64 - (i as i64 - HALF_SPAN);
                if idx >= 0 && (idx as usize) < samples.len() {
                    acc += samples[idx as usize] * tap;
                }
            }
            acc
        })
        .collect()
}

/// Complex white Gaussian noise with the given per-component deviation.
pub fn gaussian_noise<R: Rng>(len: usize, sigma: f32, rng: &mut R) -> Vec<Complex32> {
    (0..len)
        .map(|_| {
            let ni: f32 = rng.sample(StandardNormal);
            let nq: f32 = rng.sample(StandardNormal);
            Complex32::new(ni * sigma, nq * sigma)
        })
        .collect()
}
