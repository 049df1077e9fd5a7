use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use rhythmtree::prelude::*;

// ---------------------------------------------------------------------------------------------

fn performance() -> Vec<f64> {
    // a slightly rushed and dragged two bar phrase with a grace note
    vec![
        0.0, 0.48, 1.02, 1.5, 1.98, 2.66, 3.0, 3.52, 4.01, 4.02, 4.5, 5.0, 5.33, 5.67, 6.0, 7.04,
    ]
}

// ---------------------------------------------------------------------------------------------

pub fn best(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quantize");
    let points = performance();
    let notes = vec![Label::Note; points.len()];
    let grammar = default_grammar().bars(8);
    group.bench_function("Best", |b| {
        b.iter(|| {
            let quantizer = Quantizer::new(&grammar).with_interval(Interval::new(0.0, 8.0));
            black_box(quantizer.quantize(&points, &notes).next())
        })
    });
    group.finish();
}

pub fn k_best(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quantize");
    let points = performance()[..6].to_vec();
    let notes = vec![Label::Note; points.len()];
    group.bench_function("K-Best", |b| {
        b.iter(|| {
            let results = Quantizer::default()
                .with_count(50)
                .quantize(&points, &notes)
                .collect::<Vec<_>>();
            black_box(results)
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = quantize;
    config = Criterion::default();
    targets = best, k_best
}
