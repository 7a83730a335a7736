mod config;
mod report;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use num_complex::Complex32;

use framelock_core::channel::{
    apply_awgn, apply_carrier_offset, apply_fractional_delay, apply_gain, channel_rng,
    gaussian_noise,
};
use framelock_core::config::FrameFormat;
use framelock_core::{Frame, FrameCallback, FrameGenerator, FrameReceiver};

use config::CliConfig;
use report::FrameRecord;

#[derive(Parser, Debug)]
#[command(author, version, about = "Framelock burst-frame loopback driver", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Message to transmit (overrides config)
    #[arg(short, long)]
    message: Option<String>,

    /// Number of frames to transmit (overrides config)
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// AWGN level in dB (overrides config)
    #[arg(long)]
    snr: Option<f32>,

    /// Carrier frequency offset in radians/sample (overrides config)
    #[arg(long)]
    cfo: Option<f32>,

    /// Linear channel gain (overrides config)
    #[arg(long)]
    gain: Option<f32>,

    /// Fractional sample delay (overrides config)
    #[arg(long)]
    delay: Option<f32>,

    /// Emit one JSON object per decoded frame instead of human output
    #[arg(long)]
    json: bool,

    /// Write the impaired baseband to a stereo I/Q WAV file
    #[arg(short = 'w', long)]
    wav: Option<PathBuf>,

    /// Print receiver log entries at the end of the run
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(message) = args.message {
        config.run.message = message;
    }
    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(snr) = args.snr {
        config.channel.snr_db = Some(snr);
    }
    if let Some(cfo) = args.cfo {
        config.channel.cfo = cfo;
    }
    if let Some(gain) = args.gain {
        config.channel.gain = gain;
    }
    if let Some(delay) = args.delay {
        config.channel.delay = delay;
    }

    // split the message into per-frame payload chunks
    let bytes = config.run.message.as_bytes();
    let chunks: Vec<&[u8]> = if bytes.is_empty() {
        vec![&[]]
    } else {
        bytes.chunks(FrameFormat::PAYLOAD_BYTES).collect()
    };
    let total_frames = config.run.frames.max(chunks.len() as u64);

    // decoded frames stream through the callback as samples are consumed
    let json = args.json;
    let decoded: Rc<RefCell<u64>> = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&decoded);
    let callback: FrameCallback = Box::new(move |frame: Frame<'_>| {
        let mut n = counter.borrow_mut();
        let record = FrameRecord::from_frame(*n, &frame);
        *n += 1;
        if json {
            record.print_json();
        } else {
            record.print_human();
        }
    });
    let mut receiver = FrameReceiver::new(Some(callback));

    let mut generator = FrameGenerator::new();
    let mut rng = channel_rng(config.run.seed);
    let noise_floor = match config.channel.snr_db {
        // idle-gap noise at the same level the frames will see
        Some(snr) => (10.0f32.powf(-snr / 10.0) / 2.0).sqrt() * config.channel.gain,
        None => 0.0,
    };

    let progress = ProgressBar::new(total_frames);
    progress.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} frames {msg}")
            .expect("static progress template"),
    );

    let mut wav_samples: Vec<Complex32> = Vec::new();
    let mut stream_offset = 0usize;

    for index in 0..total_frames {
        let chunk = chunks[(index as usize) % chunks.len()];
        let mut payload = [0u8; FrameFormat::PAYLOAD_BYTES];
        payload[..chunk.len()].copy_from_slice(chunk);
        let header = frame_header(index as u16, chunk.len() as u8);

        let mut block = if noise_floor > 0.0 {
            gaussian_noise(config.run.gap, noise_floor, &mut rng)
        } else {
            vec![Complex32::new(0.0, 0.0); config.run.gap]
        };
        block.extend(generator.execute(&header, &payload));

        // channel impairments, applied per block with a consistent
        // carrier phase across block boundaries
        let mut impaired = apply_fractional_delay(&block, config.channel.delay);
        impaired = apply_carrier_offset(
            &impaired,
            config.channel.cfo,
            config.channel.phase,
            stream_offset,
        );
        impaired = apply_gain(&impaired, config.channel.gain);
        if let Some(snr) = config.channel.snr_db {
            impaired = apply_awgn(&impaired, snr - 20.0 * config.channel.gain.log10(), &mut rng);
        }
        stream_offset += impaired.len();

        if args.wav.is_some() {
            wav_samples.extend_from_slice(&impaired);
        }
        receiver.execute(&impaired);
        progress.inc(1);
    }
    progress.finish_and_clear();

    report::print_summary(total_frames, &receiver.data_stats());

    if let Some(path) = &args.wav {
        write_iq_wav(path, &wav_samples)
            .wrap_err_with(|| format!("writing {}", path.display()))?;
        println!("baseband written:   {} ({} samples)", path.display(), wav_samples.len());
    }

    if args.verbose {
        println!();
        print!("{}", receiver.logger());
    }

    Ok(())
}

/// Fixed header layout: magic, version, big-endian sequence number, chunk
/// length, three reserved bytes.
fn frame_header(sequence: u16, len: u8) -> [u8; FrameFormat::HEADER_BYTES] {
    let seq = sequence.to_be_bytes();
    [0x5A, 0x01, seq[0], seq[1], len, 0, 0, 0]
}

/// Stereo I/Q WAV export: left channel I, right channel Q.
fn write_iq_wav(path: &PathBuf, samples: &[Complex32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(s.re)?;
        writer.write_sample(s.im)?;
    }
    writer.finalize()?;
    Ok(())
}
