// crates/bipers-matrix/benches/reduction.rs

//! Microbenchmark for the RU reduction over lazy-heap columns.

use bipers_matrix::PermMatrix;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// Deterministic pseudo-random boundary-like matrix: each column gets a
/// handful of entries drawn from a cheap LCG.
fn synthetic_boundary(rows: u32, cols: u32) -> PermMatrix {
    let mut mat = PermMatrix::new(rows, cols);
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut entries = Vec::new();
    for j in 0..cols {
        entries.clear();
        for _ in 0..3 {
            entries.push((next() % u64::from(rows)) as u32);
        }
        entries.sort_unstable();
        entries.dedup();
        mat.set_col(j, &entries);
    }
    mat
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose_ru");
    for size in [128u32, 512] {
        group.bench_function(format!("{size}x{size}"), |b| {
            b.iter_batched(
                || synthetic_boundary(size, size),
                |mut mat| {
                    let _u = mat.decompose_ru();
                    mat
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decompose);
criterion_main!(benches);
