use criterion::criterion_main;

// ---------------------------------------------------------------------------------------------

mod benchmarks;

// ---------------------------------------------------------------------------------------------

criterion_main!(
    benchmarks::quantize::quantize, //
    benchmarks::measure::measure,
    benchmarks::rope::rope,
);
