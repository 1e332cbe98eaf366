//! Criterion benchmarks for the fixed-point capture path
//!
//! Run with: cargo bench -p spectap-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use spectap_core::fixed_fft::pack_lane;
use spectap_core::{CaptureProcessor, SpectrumQuantizer, transform_in_place, transform_real_in_place};

const SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / 44100.0;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn lanes(size: usize) -> Vec<i32> {
    generate_test_signal(2 * size)
        .chunks_exact(2)
        .map(|p| pack_lane((p[0] * 32767.0) as i16, (p[1] * 32767.0) as i16))
        .collect()
}

fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("FixedFft");

    for &size in SIZES {
        let input = lanes(size);
        group.bench_with_input(BenchmarkId::new("complex", size), &size, |b, _| {
            let mut work = input.clone();
            b.iter(|| {
                work.copy_from_slice(&input);
                transform_in_place(black_box(&mut work));
            });
        });

        if size <= 512 {
            group.bench_with_input(BenchmarkId::new("real", size * 2), &size, |b, _| {
                let mut work = input.clone();
                b.iter(|| {
                    work.copy_from_slice(&input);
                    transform_real_in_place(black_box(&mut work));
                });
            });
        }
    }

    group.finish();
}

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("SpectrumQuantizer");

    for &size in SIZES {
        let bytes: Vec<u8> = generate_test_signal(size)
            .iter()
            .map(|&x| ((x * 127.0) as i32 + 128) as u8)
            .collect();
        group.bench_with_input(BenchmarkId::new("quantize", size), &size, |b, _| {
            let mut quantizer = SpectrumQuantizer::new();
            let mut spectrum = vec![0u8; size];
            b.iter(|| quantizer.quantize(black_box(&bytes), black_box(&mut spectrum)));
        });
    }

    group.finish();
}

fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("CaptureProcessor");

    for &channels in &[1usize, 2] {
        let mono = generate_test_signal(1024);
        let interleaved: Vec<f32> = mono
            .iter()
            .flat_map(|&x| std::iter::repeat_n(x, channels))
            .collect();
        group.bench_with_input(
            BenchmarkId::new("process_1024", channels),
            &channels,
            |b, &channels| {
                let mut capture = CaptureProcessor::new(1024);
                b.iter(|| black_box(capture.process(black_box(&interleaved), channels)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_transforms, bench_quantize, bench_capture);
criterion_main!(benches);
