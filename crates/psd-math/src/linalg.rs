//! Dense linear algebra utilities.
//!
//! Cholesky factorization for the regularized normal equations, Jacobi SVD
//! and pseudoinverse for the minimum-norm fallback, 2x2 eigendecomposition
//! for covariance checks.

use ndarray::{Array1, Array2, ArrayView1};

/// Euclidean norm.
pub fn norm2(v: ArrayView1<f64>) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// 2x2 eigenvalue decomposition.
///
/// Returns (eigenvalues, eigenvectors) sorted by ascending eigenvalue.
pub fn eig_2x2(a: &[[f64; 2]; 2]) -> ([f64; 2], [[f64; 2]; 2]) {
    let trace = a[0][0] + a[1][1];
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    let disc = trace * trace - 4.0 * det;

    if disc < 0.0 {
        // Complex pair, report real parts
        let re = trace / 2.0;
        return ([re, re], [[1.0, 0.0], [0.0, 1.0]]);
    }

    let sqrt_disc = disc.sqrt();
    let l1 = (trace - sqrt_disc) / 2.0;
    let l2 = (trace + sqrt_disc) / 2.0;

    let eigvec = |l: f64, fallback: [f64; 2]| {
        if a[0][1].abs() > 1e-15 {
            let x = l - a[1][1];
            let y = a[1][0];
            let norm = (x * x + y * y).sqrt();
            [x / norm, y / norm]
        } else if a[1][0].abs() > 1e-15 {
            let x = a[0][1];
            let y = l - a[0][0];
            let norm = (x * x + y * y).sqrt();
            [x / norm, y / norm]
        } else {
            fallback
        }
    };

    let (v1, v2) = if a[0][1].abs() <= 1e-15 && a[1][0].abs() <= 1e-15 && a[0][0] > a[1][1] {
        // Diagonal with descending entries: the smaller eigenvalue sits on axis 2
        ([0.0, 1.0], [1.0, 0.0])
    } else {
        (eigvec(l1, [1.0, 0.0]), eigvec(l2, [0.0, 1.0]))
    };

    ([l1, l2], [v1, v2])
}

/// Inverse of a 2x2 matrix, `None` when singular.
pub fn inv_2x2(a: &[[f64; 2]; 2]) -> Option<[[f64; 2]; 2]> {
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    if det.abs() < 1e-300 || !det.is_finite() {
        return None;
    }
    Some([
        [a[1][1] / det, -a[0][1] / det],
        [-a[1][0] / det, a[0][0] / det],
    ])
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
///
/// Returns `None` if `A` is not symmetric positive definite to working
/// precision: a pivot that is non-finite or not above
/// `max(n, 16) · ε · max_k |a_kk|` rejects the factorization, so exactly
/// singular matrices fail even when rounding leaves a tiny positive pivot.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let max_diag = (0..n).fold(0.0_f64, |m, k| m.max(a[[k, k]].abs()));
    let pivot_floor = n.max(16) as f64 * f64::EPSILON * max_diag;
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= pivot_floor {
            return None;
        }
        let ljj = diag.sqrt();
        l[[j, j]] = ljj;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / ljj;
        }
    }
    Some(l)
}

/// Solve `L y = b` for lower-triangular `L`.
pub fn solve_lower(l: &Array2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[[i, k]] * y[k];
        }
        y[i] = s / l[[i, i]];
    }
    y
}

/// Solve `Lᵀ x = y` for lower-triangular `L`.
pub fn solve_upper_transposed(l: &Array2<f64>, y: ArrayView1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut s = y[i];
        for k in (i + 1)..n {
            s -= l[[k, i]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }
    x
}

/// Solve `A x = b` given the Cholesky factor of `A`.
pub fn cholesky_solve(l: &Array2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    let y = solve_lower(l, b);
    solve_upper_transposed(l, y.view())
}

/// Inverse of a lower-triangular matrix (itself lower-triangular).
pub fn invert_lower(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::zeros((n, n));
    let mut e = Array1::zeros(n);
    for j in 0..n {
        e.fill(0.0);
        e[j] = 1.0;
        let col = solve_lower(l, e.view());
        inv.column_mut(j).assign(&col);
    }
    inv
}

/// Simple SVD for small matrices using one-sided Jacobi rotations.
///
/// Returns (U, sigma, Vt) where A ≈ U * diag(sigma) * Vt, with sigma in
/// descending order. Suitable for the few-hundred-column systems built on
/// 2-D size grids.
pub fn svd_small(a: &Array2<f64>) -> (Array2<f64>, Array1<f64>, Array2<f64>) {
    let (m, n) = a.dim();
    let k = m.min(n);

    let mut ata = a.t().dot(a);

    // Jacobi eigenvalue iteration on A^T*A to get V and sigma^2
    let mut v = Array2::eye(n);
    let max_iter = 100;
    let scale = ata.diag().iter().fold(0.0_f64, |acc, &d| acc.max(d.abs())).max(1e-300);

    for _ in 0..max_iter {
        let mut off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += ata[[i, j]].abs();
            }
        }
        if off_diag < 1e-14 * scale {
            break;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if ata[[i, j]].abs() < 1e-15 * scale {
                    continue;
                }
                let tau = (ata[[j, j]] - ata[[i, i]]) / (2.0 * ata[[i, j]]);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cos = 1.0 / (1.0 + t * t).sqrt();
                let sin = t * cos;

                let aii = ata[[i, i]];
                let ajj = ata[[j, j]];
                let aij = ata[[i, j]];
                ata[[i, i]] = cos * cos * aii - 2.0 * sin * cos * aij + sin * sin * ajj;
                ata[[j, j]] = sin * sin * aii + 2.0 * sin * cos * aij + cos * cos * ajj;
                ata[[i, j]] = 0.0;
                ata[[j, i]] = 0.0;

                for r in 0..n {
                    if r == i || r == j {
                        continue;
                    }
                    let ri = ata[[r, i]];
                    let rj = ata[[r, j]];
                    ata[[r, i]] = cos * ri - sin * rj;
                    ata[[i, r]] = ata[[r, i]];
                    ata[[r, j]] = sin * ri + cos * rj;
                    ata[[j, r]] = ata[[r, j]];
                }

                for r in 0..n {
                    let vi = v[[r, i]];
                    let vj = v[[r, j]];
                    v[[r, i]] = cos * vi - sin * vj;
                    v[[r, j]] = sin * vi + cos * vj;
                }
            }
        }
    }

    let mut sigma = Array1::zeros(k);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        ata[[j, j]]
            .partial_cmp(&ata[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (idx, &col) in order.iter().take(k).enumerate() {
        sigma[idx] = ata[[col, col]].max(0.0).sqrt();
    }

    let mut vt = Array2::zeros((k, n));
    for (idx, &col) in order.iter().take(k).enumerate() {
        for j in 0..n {
            vt[[idx, j]] = v[[j, col]];
        }
    }

    // U = A * V * diag(1/sigma)
    let mut u = Array2::zeros((m, k));
    for idx in 0..k {
        if sigma[idx] > 1e-14 {
            let inv_s = 1.0 / sigma[idx];
            let col = a.dot(&vt.row(idx)) * inv_s;
            u.column_mut(idx).assign(&col);
        }
    }

    (u, sigma, vt)
}

/// Minimum-norm least-squares solution of `A x ≈ b`.
///
/// Singular values below `rcond · σ_max` are discarded. Returns the
/// solution and the number of singular values kept (effective rank).
pub fn lstsq_min_norm(a: &Array2<f64>, b: ArrayView1<f64>, rcond: f64) -> (Array1<f64>, usize) {
    let (u, sigma, vt) = svd_small(a);
    let n = a.ncols();
    let sigma_max = sigma.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = (rcond * sigma_max).max(1e-300);

    let mut x = Array1::zeros(n);
    let mut rank = 0;
    for idx in 0..sigma.len() {
        if sigma[idx] > cutoff {
            let coeff = u.column(idx).dot(&b) / sigma[idx];
            x.scaled_add(coeff, &vt.row(idx));
            rank += 1;
        }
    }
    (x, rank)
}
