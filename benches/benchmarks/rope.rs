use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use rhythmtree::prelude::*;

// ---------------------------------------------------------------------------------------------

fn create_rope() -> Rope {
    let mut rope = Rope::new();
    for line in 0..200 {
        let len = rope.len();
        rope = rope
            .insert(len, &format!("line {} of the text\n", line))
            .unwrap();
    }
    rope
}

// ---------------------------------------------------------------------------------------------

pub fn edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rope");
    group.bench_function("Build", |b| b.iter(|| black_box(create_rope())));
    let rope = create_rope();
    group.bench_function("Edit", |b| {
        b.iter(|| {
            let edited = rope.insert(1000, "inserted text").unwrap();
            black_box(edited.erase(500, 1500).unwrap())
        })
    });
    group.finish();
}

pub fn lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rope");
    let rope = create_rope();
    group.bench_function("Rows", |b| {
        b.iter(|| {
            let row = rope.row(rope.len() / 2).unwrap();
            black_box(rope.rowpos(row).unwrap())
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = rope;
    config = Criterion::default();
    targets = edit, lookup
}
