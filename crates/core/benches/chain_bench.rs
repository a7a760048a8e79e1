// Performance benchmarks for the effects chain
//
// Run with: cargo bench --bench chain_bench

use cadence_core::domain::dsp::*;
use cadence_core::domain::{ControlMessage, Pipeline};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

const SAMPLE_RATE: f32 = 48000.0;

fn generate_test_signal(samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

fn active_pipeline(reverb_mix: f32) -> Pipeline {
    let mut pipeline = Pipeline::new();
    for message in [
        ControlMessage::Init {
            sample_rate: SAMPLE_RATE,
        },
        ControlMessage::SetEq {
            low_gain_db: 3.0,
            mid_gain_db: -2.0,
            high_gain_db: 1.5,
        },
        ControlMessage::SetReverb { mix: reverb_mix },
    ] {
        pipeline
            .apply(message)
            .expect("benchmark messages are valid");
    }
    pipeline
}

fn bench_coefficient_design(c: &mut Criterion) {
    c.bench_function("biquad_design_three_bands", |b| {
        b.iter(|| {
            black_box(BiquadCoeffs::low_shelf(SAMPLE_RATE, black_box(80.0), 3.0));
            black_box(BiquadCoeffs::peaking(SAMPLE_RATE, black_box(1000.0), -2.0, 0.707));
            black_box(BiquadCoeffs::high_shelf(SAMPLE_RATE, black_box(10000.0), 1.5));
        });
    });
}

fn bench_stages(c: &mut Criterion) {
    let signal = generate_test_signal(512);
    let mut group = c.benchmark_group("stage_512_frames");
    group.throughput(Throughput::Elements(512));

    let mut eq = Equalizer::new(SAMPLE_RATE);
    eq.set_gains(3.0, -2.0, 1.5);
    group.bench_function("equalizer", |b| {
        b.iter(|| {
            for &s in &signal {
                black_box(eq.process_frame(s, s));
            }
        });
    });

    let mut compressor = Compressor::new(SAMPLE_RATE);
    group.bench_function("compressor", |b| {
        b.iter(|| {
            for &s in &signal {
                black_box(compressor.process_frame(s, s));
            }
        });
    });

    let mut limiter = Limiter::new(SAMPLE_RATE);
    group.bench_function("limiter", |b| {
        b.iter(|| {
            for &s in &signal {
                black_box(limiter.process_frame(s, s));
            }
        });
    });

    let mut reverb = Reverb::new(SAMPLE_RATE);
    reverb.set_mix(0.3);
    group.bench_function("reverb", |b| {
        b.iter(|| {
            for &s in &signal {
                black_box(reverb.process_frame(s, s));
            }
        });
    });

    group.finish();
}

fn bench_pipeline_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_block");

    for block_size in [64usize, 128, 512, 1024] {
        let input = generate_test_signal(block_size);
        let mut out_left = vec![0.0; block_size];
        let mut out_right = vec![0.0; block_size];

        group.throughput(Throughput::Elements(block_size as u64));
        for (label, mix) in [("dry", 0.0), ("reverb", 0.3)] {
            let mut pipeline = active_pipeline(mix);
            group.bench_with_input(BenchmarkId::new(label, block_size), &block_size, |b, _| {
                b.iter(|| {
                    pipeline.process_block(
                        black_box(&[&input[..], &input[..]]),
                        &mut [&mut out_left[..], &mut out_right[..]],
                    );
                });
            });
        }
    }

    group.finish();
}

fn bench_message_apply(c: &mut Criterion) {
    let mut pipeline = active_pipeline(0.0);
    c.bench_function("apply_set_eq", |b| {
        b.iter(|| {
            pipeline
                .apply(black_box(ControlMessage::SetEq {
                    low_gain_db: 2.0,
                    mid_gain_db: 0.0,
                    high_gain_db: -2.0,
                }))
                .ok();
        });
    });
}

criterion_group!(
    benches,
    bench_coefficient_design,
    bench_stages,
    bench_pipeline_block,
    bench_message_apply,
);

criterion_main!(benches);
