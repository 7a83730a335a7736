//! Numerically-controlled oscillator for carrier derotation.

use num_complex::Complex32;
use std::f32::consts::{PI, TAU};

/// Phase/frequency accumulator producing a complex exponential. The
/// receiver programs it with the detector's coarse carrier estimates and
/// steps it once per input sample.
#[derive(Debug, Clone, Default)]
pub struct Nco {
    phase: f32,
    frequency: f32,
}

impl Nco {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the phase increment per sample (radians)
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the current phase (radians)
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap(phase);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Rotate a sample down by the current phase
    pub fn mix_down(&self, sample: Complex32) -> Complex32 {
        sample * Complex32::from_polar(1.0, -self.phase)
    }

    /// Rotate a sample up by the current phase
    pub fn mix_up(&self, sample: Complex32) -> Complex32 {
        sample * Complex32::from_polar(1.0, self.phase)
    }

    /// Advance the phase by one sample period
    pub fn step(&mut self) {
        self.phase = wrap(self.phase + self.frequency);
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.frequency = 0.0;
    }
}

fn wrap(mut phase: f32) -> f32 {
    while phase > PI {
        phase -= TAU;
    }
    while phase < -PI {
        phase += TAU;
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mix_down_removes_known_rotation() {
        let mut nco = Nco::new();
        nco.set_frequency(0.03);
        nco.set_phase(0.7);

        for n in 0..50 {
            let x = Complex32::from_polar(1.0, 0.7 + 0.03 * n as f32);
            let v = nco.mix_down(x);
            assert_relative_eq!(v.re, 1.0, epsilon = 1e-4);
            assert_relative_eq!(v.im, 0.0, epsilon = 1e-4);
            nco.step();
        }
    }

    #[test]
    fn mix_up_then_down_is_identity() {
        let mut nco = Nco::new();
        nco.set_frequency(-0.11);
        let x = Complex32::new(0.6, -0.4);
        for _ in 0..10 {
            let y = nco.mix_down(nco.mix_up(x));
            assert_relative_eq!(y.re, x.re, epsilon = 1e-5);
            assert_relative_eq!(y.im, x.im, epsilon = 1e-5);
            nco.step();
        }
    }

    #[test]
    fn phase_stays_wrapped() {
        let mut nco = Nco::new();
        nco.set_frequency(3.0);
        for _ in 0..1000 {
            nco.step();
        }
        assert!(nco.phase().abs() <= PI + 1e-5);
    }

    #[test]
    fn reset_clears_phase_and_frequency() {
        let mut nco = Nco::new();
        nco.set_frequency(0.2);
        nco.set_phase(1.0);
        nco.reset();
        assert_eq!(nco.frequency(), 0.0);
        assert_eq!(nco.phase(), 0.0);
    }
}
