use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use psd_math::linalg::{cholesky, cholesky_solve};
use psd_math::nnls::{nnls_projected_gradient, NnlsConfig};
use psd_math::sparse::CsrMatrix;
use std::hint::black_box;

/// Banded kernel: each row responds to its own element and two neighbours.
fn banded(n: usize) -> CsrMatrix {
    let mut t = Vec::with_capacity(3 * n);
    for i in 0..n {
        t.push((i, i, 1.0));
        if i > 0 {
            t.push((i, i - 1, 0.3));
        }
        if i + 1 < n {
            t.push((i, i + 1, 0.3));
        }
    }
    CsrMatrix::from_triplets(n, n, &t)
}

fn bench_nnls(c: &mut Criterion) {
    let mut group = c.benchmark_group("nnls_projected_gradient");
    group.sample_size(10);
    for n in [120usize, 480] {
        let a = banded(n);
        let x_true = Array1::from_shape_fn(n, |i| (-((i as f64 - n as f64 / 2.0) / 20.0).powi(2)).exp());
        let b = a.matvec(x_true.view());
        let cfg = NnlsConfig {
            max_iterations: 500,
            tolerance: 1e-12,
        };
        group.bench_function(format!("banded_{n}"), |bench| {
            bench.iter(|| black_box(nnls_projected_gradient(&a, &b, None, &cfg).x[0]))
        });
    }
    group.finish();
}

fn bench_cholesky(c: &mut Criterion) {
    let mut group = c.benchmark_group("normal_equations");
    for n in [120usize, 240] {
        let a = banded(n);
        let g = a.gram() + ndarray::Array2::<f64>::eye(n) * 1e-2;
        let rhs = Array1::from_elem(n, 1.0);
        group.bench_function(format!("cholesky_{n}"), |bench| {
            bench.iter(|| {
                let l = cholesky(&g).expect("gram + ridge is SPD");
                black_box(cholesky_solve(&l, rhs.view())[0])
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_nnls, bench_cholesky);
criterion_main!(benches);
