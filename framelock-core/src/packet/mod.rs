//! Packet codec: bytes to QPSK data symbols and back.
//!
//! A 72-byte packet (8-byte header + 64-byte payload) is extended with a
//! 3-byte CRC-24, Golay(24,12)-encoded to 1200 bits and Gray-mapped onto
//! 600 QPSK symbols. Decoding is the exact inverse with hard decisions;
//! CRC failure is reported through the validity flag, never as an error.

pub mod crc;
pub mod golay;

use num_complex::Complex32;

use crate::config::FrameFormat;
use crate::packet::crc::{crc24_bytes, crc24_check};
use crate::packet::golay::GolayCodec;
use crate::utils::{bits_to_bytes, bits_to_u16, bytes_to_bits, qpsk_bits, qpsk_symbol};

/// Uncoded packet bits including the CRC (75 bytes)
const PACKET_BITS: usize = (FrameFormat::PACKET_BYTES + FrameFormat::CRC_BYTES) * 8;

/// Golay codewords per packet
const NUM_BLOCKS: usize = PACKET_BITS / 12;

/// Fixed-format packet encoder/decoder.
pub struct PacketCodec {
    golay: GolayCodec,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            golay: GolayCodec::new(),
        }
    }

    /// Number of data symbols carrying one packet
    pub fn frame_len(&self) -> usize {
        FrameFormat::DATA_SYMS
    }

    /// Encode a packet into `FrameFormat::DATA_SYMS` QPSK symbols,
    /// appended to `symbols`.
    pub fn encode(&self, packet: &[u8; FrameFormat::PACKET_BYTES], symbols: &mut Vec<Complex32>) {
        let mut protected = Vec::with_capacity(FrameFormat::PACKET_BYTES + FrameFormat::CRC_BYTES);
        protected.extend_from_slice(packet);
        protected.extend_from_slice(&crc24_bytes(packet));

        let bits = bytes_to_bits(&protected);
        debug_assert_eq!(bits.len(), PACKET_BITS);

        let mut coded = Vec::with_capacity(PACKET_BITS * 2);
        for block in bits.chunks(12) {
            let codeword = self.golay.encode(bits_to_u16(block));
            for bit in (0..24).rev() {
                coded.push(((codeword >> bit) & 1) as u8);
            }
        }

        for pair in coded.chunks(2) {
            symbols.push(qpsk_symbol(pair[0], pair[1]));
        }
    }

    /// Decode `FrameFormat::DATA_SYMS` received symbols into a packet.
    /// Returns the CRC validity; the bytes are delivered either way.
    pub fn decode(
        &self,
        symbols: &[Complex32],
        packet: &mut [u8; FrameFormat::PACKET_BYTES],
    ) -> bool {
        assert_eq!(symbols.len(), FrameFormat::DATA_SYMS, "payload symbol count");

        let mut coded = Vec::with_capacity(PACKET_BITS * 2);
        for &s in symbols {
            let (b0, b1) = qpsk_bits(s);
            coded.push(b0);
            coded.push(b1);
        }

        let mut bits = Vec::with_capacity(PACKET_BITS);
        for block in coded.chunks(24) {
            let mut word = 0u32;
            for &b in block {
                word = (word << 1) | u32::from(b);
            }
            let data = self.golay.decode(word);
            for bit in (0..12).rev() {
                bits.push(((data >> bit) & 1) as u8);
            }
        }
        debug_assert_eq!(bits.len(), PACKET_BITS);

        let bytes = bits_to_bytes(&bits);
        packet.copy_from_slice(&bytes[..FrameFormat::PACKET_BYTES]);
        crc24_check(
            &bytes[..FrameFormat::PACKET_BYTES],
            &bytes[FrameFormat::PACKET_BYTES..],
        )
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}
