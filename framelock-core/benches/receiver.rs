//! Receiver throughput benchmarks: preamble search over noise, and the
//! full detect-track-decode path over clean frames.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use framelock_core::channel::gaussian_noise;
use framelock_core::{FrameGenerator, FrameReceiver};

fn bench_detection_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let noise = gaussian_noise(65_536, std::f32::consts::FRAC_1_SQRT_2, &mut rng);

    let mut group = c.benchmark_group("detection_search");
    group.throughput(Throughput::Elements(noise.len() as u64));
    group.bench_function("noise_only", |b| {
        let mut rx = FrameReceiver::new(None);
        b.iter(|| {
            rx.execute(black_box(&noise));
            rx.reset();
        });
    });
    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let header = [0xA5u8; 8];
    let payload: Vec<u8> = (0..64).map(|i| i as u8).collect();
    let payload: [u8; 64] = payload.try_into().unwrap();
    let frame = FrameGenerator::new().execute(&header, &payload);

    let mut group = c.benchmark_group("frame_decode");
    group.throughput(Throughput::Elements(frame.len() as u64));
    group.bench_function("clean_frame", |b| {
        let mut rx = FrameReceiver::new(None);
        b.iter(|| {
            rx.execute(black_box(&frame));
        });
    });
    group.finish();
}

fn bench_frame_generation(c: &mut Criterion) {
    let header = [0x3Cu8; 8];
    let payload = [0x96u8; 64];

    c.bench_function("frame_generate", |b| {
        let mut gen = FrameGenerator::new();
        b.iter(|| black_box(gen.execute(black_box(&header), black_box(&payload))));
    });
}

criterion_group!(
    benches,
    bench_detection_search,
    bench_frame_decode,
    bench_frame_generation
);
criterion_main!(benches);
