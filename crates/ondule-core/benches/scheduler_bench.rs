//! Criterion benchmarks for the graph compiler and the frame scheduler.
//!
//! Measures runtime overhead independently of DSP cost using a trivial gain
//! object. Two axes:
//!
//! - **Compile** — edge recovery, distance walk and Kahn sort over chains and
//!   feedback rings
//! - **Execute** — `TaskScheduler::process()` per frame at varying frame
//!   lengths
//!
//! Run with: `cargo bench -p ondule-core`
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ondule_core::{
    AudioContext, EngineConfig, GraphCompiler, Object, ObjectIo, ObjectList, TaskScheduler,
    connect,
};

const FRAME_LENGTHS: &[usize] = &[32, 64, 128, 256, 512];
const GRAPH_SIZES: &[usize] = &[8, 32, 128];

fn gain(ctx: &AudioContext, i: usize) -> Arc<Object> {
    Object::builder(format!("g{i}"), ctx)
        .inlet("In")
        .outlet("Out")
        .parameter("Gain", 0.99)
        .build(|io: &ObjectIo<'_>| {
            let input = io.inlet(0).buffer();
            let g = io.parameter(0).value();
            for n in 0..io.frame_length() {
                io.outlet(0).buffer().set(n, input.get(n) * g);
            }
        })
}

/// `n` gains in series, listed in reverse so the sort has work to do.
fn chain(ctx: &AudioContext, n: usize) -> Vec<Arc<Object>> {
    let objects: Vec<_> = (0..n).map(|i| gain(ctx, i)).collect();
    for pair in objects.windows(2) {
        connect(&pair[0], "Out", &pair[1], "In").unwrap();
    }
    objects.into_iter().rev().collect()
}

/// A chain whose last object feeds back into the first.
fn ring(ctx: &AudioContext, n: usize) -> Vec<Arc<Object>> {
    let objects = chain(ctx, n);
    connect(&objects[0], "Out", &objects[n - 1], "In").unwrap();
    objects
}

fn bench_compile(c: &mut Criterion) {
    let ctx = AudioContext::with_defaults();
    let compiler = GraphCompiler::new();
    let mut group = c.benchmark_group("compile");

    for &n in GRAPH_SIZES {
        let objects = chain(&ctx, n);
        group.bench_with_input(BenchmarkId::new("chain", n), &objects, |b, objects| {
            b.iter(|| black_box(compiler.compile(black_box(objects))));
        });

        let objects = ring(&ctx, n);
        group.bench_with_input(BenchmarkId::new("ring", n), &objects, |b, objects| {
            b.iter(|| black_box(compiler.compile(black_box(objects))));
        });
    }
    group.finish();
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");

    for &frame_length in FRAME_LENGTHS {
        let ctx = AudioContext::new(EngineConfig {
            frame_length,
            ..EngineConfig::default()
        })
        .unwrap();
        let objects = chain(&ctx, 32);
        let list = Arc::new(ObjectList::new("chain"));
        list.set_order(&GraphCompiler::new().compile(&objects).order);
        let scheduler = TaskScheduler::new();
        scheduler.add(list);

        let input = vec![0.5f32; frame_length * 2];
        let mut output = vec![0.0f32; frame_length * 2];
        group.bench_with_input(
            BenchmarkId::new("chain32", frame_length),
            &frame_length,
            |b, _| {
                b.iter(|| {
                    scheduler.process(black_box(&input), &mut output);
                    black_box(output[0])
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_process);
criterion_main!(benches);
