use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use otsync_core::TextOperation;

/// Scatter single-character inserts across a document of the given length.
fn scattered_inserts(doc_len: usize, count: usize) -> TextOperation {
    let step = doc_len / (count + 1);
    let mut op = TextOperation::new();
    let mut consumed = 0;
    for i in 0..count {
        let target = (i + 1) * step;
        op = op.retain(target - consumed).insert("x");
        consumed = target;
    }
    op.retain(doc_len - consumed)
}

/// Benchmark applying an operation to documents of increasing size
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("op_apply");

    for size in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let doc = "a".repeat(size);
            let op = scattered_inserts(size, 50);
            b.iter(|| black_box(op.apply(&doc).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark composing a chain of single-character edits, the hot path
/// while a client buffers keystrokes waiting for an acknowledgement
fn bench_compose_typing_burst(c: &mut Criterion) {
    c.bench_function("op_compose_100_keystrokes", |b| {
        b.iter(|| {
            let mut composed = TextOperation::new();
            for i in 0..100 {
                let keystroke = TextOperation::new().retain(i).insert("a");
                composed = composed.compose(&keystroke).unwrap();
            }
            black_box(composed)
        });
    });
}

/// Benchmark transforming two concurrent scattered edits
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("op_transform");

    for size in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let a = scattered_inserts(size, 50);
            let other = scattered_inserts(size, 80);
            b.iter(|| black_box(TextOperation::transform(&a, &other).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark wire (de)serialization of a scattered operation
fn bench_wire_round_trip(c: &mut Criterion) {
    let op = scattered_inserts(10_000, 100);
    let json = serde_json::to_string(&op).unwrap();

    c.bench_function("op_serialize_100_tokens", |b| {
        b.iter(|| black_box(serde_json::to_string(&op).unwrap()));
    });

    c.bench_function("op_deserialize_100_tokens", |b| {
        b.iter(|| black_box(serde_json::from_str::<TextOperation>(&json).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_apply,
    bench_compose_typing_burst,
    bench_transform,
    bench_wire_round_trip,
);

criterion_main!(benches);
