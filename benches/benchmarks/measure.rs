use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use rhythmtree::prelude::*;

// ---------------------------------------------------------------------------------------------

pub fn closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("Measure");
    let tree = Tree::from_string("3n2nr2sn").unwrap();
    group.bench_function("Expansions", |b| b.iter(|| black_box(expansions(&tree))));
    group.finish();
}

pub fn simplification(c: &mut Criterion) {
    let mut group = c.benchmark_group("Measure");
    let tree = Tree::from_string("22ns22sr2nn").unwrap();
    group.bench_function("Normalize", |b| b.iter(|| black_box(normalize(&tree))));
    group.bench_function("Simplify", |b| {
        b.iter(|| black_box(simplify(&tree, Some(0x1234))))
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = measure;
    config = Criterion::default();
    targets = closure, simplification
}
