//! Benchmark for the answer extraction cascade

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mmlupro_core::AnswerExtractor;

fn bench_extract(c: &mut Criterion) {
    let extractor = AnswerExtractor::new().unwrap();
    let reasoning = "Let's think step by step. ".repeat(200);

    let mut group = c.benchmark_group("extract");

    // Each input resolves at a different depth of the cascade
    let inputs = [
        ("primary", format!("{}the answer is (C).", reasoning)),
        ("parenthesized", format!("{}so (A) or maybe (D)", reasoning)),
        ("standalone", format!("{}final pick: G", reasoning.to_lowercase())),
        ("miss", reasoning.to_lowercase()),
    ];

    for (name, completion) in inputs.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), completion, |b, text| {
            b.iter(|| {
                let _ = black_box(extractor.extract_and_score(black_box(text), "C"));
            });
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_cascade", |b| {
        b.iter(|| black_box(AnswerExtractor::for_options(black_box(10)).unwrap()));
    });
}

criterion_group!(benches, bench_extract, bench_compile);
criterion_main!(benches);
