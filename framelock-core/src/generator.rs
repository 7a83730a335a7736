//! Frame assembly and modulation (transmit side).
//!
//! A frame is the 64-symbol p/n preamble, the 630-symbol pilot-interleaved
//! payload, and 2m flush symbols that push the final pulse tails through
//! the transmit and receive filters, all interpolated to 2 samples/symbol:
//! 1400 samples total.

use num_complex::Complex32;

use crate::config::FrameFormat;
use crate::msequence::pn_preamble;
use crate::packet::PacketCodec;
use crate::pilots::PilotGen;
use crate::signal_processing::Interp;

/// Fixed-format frame modulator.
pub struct FrameGenerator {
    packet: PacketCodec,
    pilot_gen: PilotGen,
    interp: Interp,
    preamble: Vec<Complex32>,
    data_syms: Vec<Complex32>,
    payload_syms: Vec<Complex32>,
}

impl FrameGenerator {
    pub fn new() -> Self {
        Self {
            packet: PacketCodec::new(),
            pilot_gen: PilotGen::new(),
            interp: Interp::new(),
            preamble: pn_preamble(),
            data_syms: Vec::with_capacity(FrameFormat::DATA_SYMS),
            payload_syms: Vec::with_capacity(FrameFormat::PAYLOAD_SYMS),
        }
    }

    /// Transmitted samples per frame
    pub fn frame_len(&self) -> usize {
        FrameFormat::FRAME_LEN
    }

    /// Modulate one frame.
    pub fn execute(
        &mut self,
        header: &[u8; FrameFormat::HEADER_BYTES],
        payload: &[u8; FrameFormat::PAYLOAD_BYTES],
    ) -> Vec<Complex32> {
        let mut packet = [0u8; FrameFormat::PACKET_BYTES];
        packet[..FrameFormat::HEADER_BYTES].copy_from_slice(header);
        packet[FrameFormat::HEADER_BYTES..].copy_from_slice(payload);

        self.data_syms.clear();
        self.packet.encode(&packet, &mut self.data_syms);

        self.payload_syms.clear();
        self.pilot_gen.execute(&self.data_syms, &mut self.payload_syms);

        // each frame starts from a clean filter state so back-to-back
        // frames are sample-identical to isolated ones
        self.interp.reset();
        let mut samples = Vec::with_capacity(FrameFormat::FRAME_LEN);
        for &s in &self.preamble {
            samples.extend(self.interp.execute(s));
        }
        for &s in &self.payload_syms {
            samples.extend(self.interp.execute(s));
        }
        for _ in 0..2 * FrameFormat::M {
            samples.extend(self.interp.execute(Complex32::new(0.0, 0.0)));
        }
        debug_assert_eq!(samples.len(), FrameFormat::FRAME_LEN);
        samples
    }
}

impl Default for FrameGenerator {
    fn default() -> Self {
        Self::new()
    }
}
