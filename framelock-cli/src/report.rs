//! Per-frame telemetry records and the end-of-run summary.

use serde::Serialize;

use framelock_core::{Frame, FrameDataStats};

/// One decoded frame, flattened for display or JSON-lines output.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub sequence: u16,
    pub valid: bool,
    pub message: String,
    pub rssi_db: f32,
    pub cfo: f32,
}

impl FrameRecord {
    pub fn from_frame(index: u64, frame: &Frame<'_>) -> Self {
        let sequence = u16::from_be_bytes([frame.header[2], frame.header[3]]);
        let len = (frame.header[4] as usize).min(frame.payload.len());
        let message = String::from_utf8_lossy(&frame.payload[..len]).into_owned();
        Self {
            frame: index,
            sequence,
            valid: frame.payload_valid,
            message,
            rssi_db: frame.stats.rssi,
            cfo: frame.stats.cfo,
        }
    }

    pub fn print_human(&self) {
        let status = if self.valid { "ok " } else { "CRC" };
        println!(
            "frame {:>3} [{}] seq={:<4} rssi={:+6.2} dB cfo={:+.5} {}",
            self.frame,
            status,
            self.sequence,
            self.rssi_db,
            self.cfo,
            if self.valid { self.message.as_str() } else { "" },
        );
    }

    pub fn print_json(&self) {
        match serde_json::to_string(self) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("telemetry serialization failed: {err}"),
        }
    }
}

/// Final run summary.
pub fn print_summary(sent: u64, stats: &FrameDataStats) {
    println!();
    println!("transmitted frames: {sent}");
    println!("receiver totals:    {stats}");
    let rate = if sent > 0 {
        100.0 * stats.payloads_valid as f64 / sent as f64
    } else {
        0.0
    };
    println!("delivery rate:      {rate:.1}%");
}
