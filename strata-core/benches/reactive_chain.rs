use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strata_core::manifest::DependencyExtractor;
use strata_core::reactive::{ComputedCell, StateCell};

fn chain(depth: usize) -> (StateCell<u64>, ComputedCell<u64>) {
    let root = StateCell::new(0u64);
    let first = {
        let root = root.clone();
        ComputedCell::new(move || root.read() + 1)
    };

    let mut tail = first;
    for _ in 1..depth {
        let prev = tail.clone();
        tail = ComputedCell::try_new(move || Ok(prev.read()? + 1));
    }
    (root, tail)
}

fn write_then_read(c: &mut Criterion) {
    let (root, tail) = chain(64);
    let mut n = 0u64;

    c.bench_function("chain_64_write_read", |b| {
        b.iter(|| {
            n += 1;
            root.write(n);
            black_box(tail.read().unwrap())
        })
    });
}

fn clean_read(c: &mut Criterion) {
    let (_root, tail) = chain(64);
    tail.read().unwrap();

    c.bench_function("chain_64_clean_read", |b| b.iter(|| black_box(tail.read().unwrap())));
}

fn extract(c: &mut Criterion) {
    let extractor = DependencyExtractor::new();
    let source = "function f(a, { b, c }) { const d = a + b; return items.map((x) => x * d + c + scale) }";

    c.bench_function("extract_small_driver", |b| {
        b.iter(|| black_box(extractor.extract("f", source).unwrap()))
    });
}

criterion_group!(benches, write_then_read, clean_read, extract);
criterion_main!(benches);
