//! Non-negative least squares by accelerated projected gradient.
//!
//! Solves min ||A x − b||² subject to x ≥ 0 for a sparse A. Each step
//! takes a gradient step of length 1/L from a Nesterov extrapolation and
//! clips to the non-negative orthant; L is the largest eigenvalue of
//! AᵀA, estimated by power iteration.

use ndarray::Array1;

use crate::linalg::norm2;
use crate::sparse::CsrMatrix;

/// Power iterations used for the Lipschitz estimate.
const POWER_ITERS: usize = 60;

/// Safety factor on the Lipschitz estimate.
const LIPSCHITZ_MARGIN: f64 = 1.05;

#[derive(Debug, Clone)]
pub struct NnlsConfig {
    /// Maximum projected-gradient steps (default: 5000).
    pub max_iterations: usize,
    /// Stop when ||x_k − x_{k−1}|| ≤ tolerance · max(||x_k||, 1e-300) (default: 1e-10).
    pub tolerance: f64,
}

impl Default for NnlsConfig {
    fn default() -> Self {
        NnlsConfig {
            max_iterations: 5000,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NnlsResult {
    pub x: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Relative change at the last step.
    pub final_change: f64,
}

/// Largest eigenvalue of AᵀA by power iteration.
pub fn spectral_norm_sq(a: &CsrMatrix) -> f64 {
    let n = a.ncols();
    if n == 0 || a.nnz() == 0 {
        return 0.0;
    }
    let mut v = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    let mut lambda = 0.0;
    for _ in 0..POWER_ITERS {
        let w = a.transpose_matvec(a.matvec(v.view()).view());
        let nw = norm2(w.view());
        if nw <= 0.0 {
            // v landed in the null space; the Frobenius bound is still valid
            return a.frobenius_sq();
        }
        lambda = nw;
        v = w / nw;
    }
    lambda
}

/// Projected gradient descent with Nesterov momentum.
///
/// `x0` seeds the iteration (clipped to x ≥ 0); zeros otherwise.
pub fn nnls_projected_gradient(
    a: &CsrMatrix,
    b: &Array1<f64>,
    x0: Option<&Array1<f64>>,
    config: &NnlsConfig,
) -> NnlsResult {
    let n = a.ncols();
    assert_eq!(b.len(), a.nrows(), "nnls: b has {} entries, A has {} rows", b.len(), a.nrows());

    let mut x = match x0 {
        Some(x0) => x0.mapv(|v| v.max(0.0)),
        None => Array1::zeros(n),
    };

    let lipschitz = spectral_norm_sq(a) * LIPSCHITZ_MARGIN;
    if lipschitz <= 0.0 {
        return NnlsResult {
            x: Array1::zeros(n),
            iterations: 0,
            converged: true,
            final_change: 0.0,
        };
    }
    let step = 1.0 / lipschitz;

    let mut x_prev = x.clone();
    let mut change = f64::INFINITY;

    for k in 0..config.max_iterations {
        let momentum = k as f64 / (k as f64 + 3.0);
        let y = &x + &((&x - &x_prev) * momentum);
        let residual = a.matvec(y.view()) - b;
        let grad = a.transpose_matvec(residual.view());
        let x_next = (&y - &(grad * step)).mapv(|v| v.max(0.0));

        let dx = norm2((&x_next - &x).view());
        let scale = norm2(x_next.view()).max(1e-300);
        change = dx / scale;

        x_prev = std::mem::replace(&mut x, x_next);

        if change <= config.tolerance {
            return NnlsResult {
                x,
                iterations: k + 1,
                converged: true,
                final_change: change,
            };
        }
    }

    NnlsResult {
        x,
        iterations: config.max_iterations,
        converged: false,
        final_change: change,
    }
}
