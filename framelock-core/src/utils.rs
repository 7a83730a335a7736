//! Bit- and symbol-level conversion helpers shared by the codec stages.

use num_complex::Complex32;
use std::f32::consts::FRAC_1_SQRT_2;

/// Expand bytes into individual bits, MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1))
        .collect()
}

/// Pack bits (MSB first) back into bytes. The bit count must be a multiple
/// of eight.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    debug_assert_eq!(bits.len() % 8, 0);
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}

/// Fold up to 16 bits (MSB first) into an integer.
pub fn bits_to_u16(bits: &[u8]) -> u16 {
    debug_assert!(bits.len() <= 16);
    bits.iter().fold(0u16, |acc, &b| (acc << 1) | u16::from(b & 1))
}

/// Gray-coded QPSK constellation shared by the packet codec and the pilot
/// generator. The mapping must be identical on both ends of the link.
pub fn qpsk_symbol(b0: u8, b1: u8) -> Complex32 {
    let re = if b0 & 1 == 1 {
        FRAC_1_SQRT_2
    } else {
        -FRAC_1_SQRT_2
    };
    let im = if b1 & 1 == 1 {
        FRAC_1_SQRT_2
    } else {
        -FRAC_1_SQRT_2
    };
    Complex32::new(re, im)
}

/// Hard-decision QPSK slicer, the inverse of [`qpsk_symbol`].
pub fn qpsk_bits(symbol: Complex32) -> (u8, u8) {
    (u8::from(symbol.re > 0.0), u8::from(symbol.im > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_packing_roundtrip() {
        let bytes = [0xA5u8, 0x00, 0xFF, 0x3C];
        let bits = bytes_to_bits(&bytes);
        assert_eq!(bits.len(), 32);
        assert_eq!(&bits[..8], &[1, 0, 1, 0, 0, 1, 0, 1]);
        assert_eq!(bits_to_bytes(&bits), bytes);
    }

    #[test]
    fn bits_to_u16_msb_first() {
        assert_eq!(bits_to_u16(&[1, 0, 1, 1]), 0b1011);
        assert_eq!(bits_to_u16(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]), 1);
    }

    #[test]
    fn qpsk_mapping_roundtrip() {
        for b0 in 0..2u8 {
            for b1 in 0..2u8 {
                let s = qpsk_symbol(b0, b1);
                assert!((s.norm() - 1.0).abs() < 1e-6);
                assert_eq!(qpsk_bits(s), (b0, b1));
            }
        }
    }

    #[test]
    fn qpsk_slicer_tolerates_noise() {
        let s = qpsk_symbol(1, 0) + Complex32::new(-0.2, 0.3);
        assert_eq!(qpsk_bits(s), (1, 0));
    }
}
