//! Shared fixtures for the receiver integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use num_complex::Complex32;

use framelock_core::{Frame, FrameCallback, FrameReceiver};

/// Everything a test needs to know about one delivered frame, copied out
/// of the callback borrow.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub header: [u8; 8],
    pub header_valid: bool,
    pub payload: [u8; 64],
    pub payload_valid: bool,
    pub num_symbols: usize,
    pub evm: f32,
    pub rssi: f32,
    pub cfo: f32,
}

pub type Captures = Rc<RefCell<Vec<CapturedFrame>>>;

/// A receiver wired to a capture sink.
pub fn receiver_with_capture() -> (FrameReceiver, Captures) {
    let captures: Captures = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&captures);
    let callback: FrameCallback = Box::new(move |frame: Frame<'_>| {
        sink.borrow_mut().push(CapturedFrame {
            header: *frame.header,
            header_valid: frame.header_valid,
            payload: *frame.payload,
            payload_valid: frame.payload_valid,
            num_symbols: frame.symbols.len(),
            evm: frame.stats.evm,
            rssi: frame.stats.rssi,
            cfo: frame.stats.cfo,
        });
    });
    (FrameReceiver::new(Some(callback)), captures)
}

/// Deterministic but irregular packet contents.
pub fn test_packet(seed: u8) -> ([u8; 8], [u8; 64]) {
    let mut header = [0u8; 8];
    for (i, b) in header.iter_mut().enumerate() {
        *b = seed.wrapping_add(i as u8).wrapping_mul(31);
    }
    let mut payload = [0u8; 64];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = seed.wrapping_mul(17).wrapping_add((i as u8).wrapping_mul(73));
    }
    (header, payload)
}

/// Quiet guard samples around a frame.
pub fn silence(len: usize) -> Vec<Complex32> {
    vec![Complex32::new(0.0, 0.0); len]
}
