use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gf_bench::gen_matrix;
use gf_core::{row_product_cat, SparseMatrix};

fn bench_row_product_cat(c: &mut Criterion) {
    let mut g = c.benchmark_group("gf_core_row_product_cat");
    // Token sequence (T + 2 rows) against a single action row.
    for &rows in &[8usize, 64usize] {
        let seq = gen_matrix(rows, 2048, 1);
        let act = gen_matrix(1, 16, 2);
        g.bench_with_input(BenchmarkId::new("sequence_x_action", rows), &rows, |b, _| {
            b.iter(|| black_box(row_product_cat(black_box(&seq), black_box(&act))))
        });
    }
    // Two sequence features: every pairwise combination.
    let a = gen_matrix(24, 2048, 1);
    let b2 = gen_matrix(24, 303, 300);
    g.bench_function("sequence_x_sequence_24", |b| {
        b.iter(|| black_box(row_product_cat(black_box(&a), black_box(&b2))))
    });
    g.finish();
}

fn bench_fold(c: &mut Criterion) {
    let parts = [
        gen_matrix(12, 2048, 1),
        gen_matrix(1, 16, 2),
        gen_matrix(1, 1, 1),
    ];
    c.bench_function("gf_core_fold_from_unit", |b| {
        b.iter(|| {
            let mut acc = SparseMatrix::unit();
            for m in &parts {
                acc = row_product_cat(&acc, m);
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_row_product_cat, bench_fold);
criterion_main!(benches);
