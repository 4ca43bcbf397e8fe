// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Exponential-Distance Prior
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Correlation-aware regularization.
//!
//! Prior covariance between elements i, j with transformed-space centres
//! tᵢ, tⱼ:
//!   Σᵢⱼ = exp(−sqrt((tᵢ − tⱼ)ᵀ Gd⁻¹ (tᵢ − tⱼ)))
//! The operator is L = C⁻¹ with Σ = C Cᵀ, so LᵀL = Σ⁻¹.

use ndarray::{Array1, Array2};
use psd_grid::GridLike;
use psd_math::linalg::{cholesky, eig_2x2, inv_2x2, invert_lower};
use psd_math::sparse::CsrMatrix;
use psd_types::config::Constraint;
use psd_types::constants::EXP_DIST_TRUNCATION;
use psd_types::error::{ensure_len, InversionError, InversionResult};
use psd_types::state::Reconstruction;

use crate::tikhonov::TikhonovSolver;

/// Diagonal jitter tried in turn when Σ does not factor.
const JITTER: [f64; 4] = [0.0, 1e-12, 1e-10, 1e-8];

/// Check that `gd` is a finite symmetric positive-definite 2×2 matrix.
fn validate_gd(gd: &[[f64; 2]; 2]) -> InversionResult<()> {
    if gd.iter().flatten().any(|v| !v.is_finite()) {
        return Err(InversionError::ConfigError("Gd must be finite".to_string()));
    }
    let scale = gd[0][0].abs().max(gd[1][1].abs()).max(f64::MIN_POSITIVE);
    if (gd[0][1] - gd[1][0]).abs() > 1e-12 * scale {
        return Err(InversionError::ConfigError("Gd must be symmetric".to_string()));
    }
    let (eig, _) = eig_2x2(gd);
    if eig[0] <= 0.0 {
        return Err(InversionError::ConfigError(format!(
            "Gd must be positive definite, eigenvalues {:?}",
            eig
        )));
    }
    Ok(())
}

/// Prior covariance Σ over the active elements of `grid`.
pub fn exp_dist_covariance(grid: &dyn GridLike, gd: [[f64; 2]; 2]) -> InversionResult<Array2<f64>> {
    validate_gd(&gd)?;
    let gi = inv_2x2(&gd)
        .ok_or_else(|| InversionError::ConfigError("Gd is singular".to_string()))?;

    let spacing = grid.full().spacing();
    let el = grid.elements();
    let n = el.nrows();
    let t: Vec<[f64; 2]> = (0..n)
        .map(|k| [spacing[0].forward(el[[k, 0]]), spacing[1].forward(el[[k, 1]])])
        .collect();

    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        let d0 = t[i][0] - t[j][0];
        let d1 = t[i][1] - t[j][1];
        let q = d0 * (gi[0][0] * d0 + gi[0][1] * d1) + d1 * (gi[1][0] * d0 + gi[1][1] * d1);
        (-q.max(0.0).sqrt()).exp()
    }))
}

/// Square operator `L` with `LᵀL = Σ⁻¹`, truncated to a sparse matrix.
pub fn exp_dist_operator(grid: &dyn GridLike, gd: [[f64; 2]; 2]) -> InversionResult<CsrMatrix> {
    let sigma = exp_dist_covariance(grid, gd)?;
    let n = sigma.nrows();

    let mut factor = None;
    for jitter in JITTER {
        let c = if jitter > 0.0 {
            tracing::debug!(jitter, "retrying exp-dist factorization with diagonal jitter");
            cholesky(&(&sigma + &(Array2::<f64>::eye(n) * jitter)))
        } else {
            cholesky(&sigma)
        };
        if c.is_some() {
            factor = c;
            break;
        }
    }
    let c = factor.ok_or_else(|| {
        InversionError::SingularSystem("exp-dist covariance is not positive definite".to_string())
    })?;

    let l = invert_lower(&c);
    let max = l.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let op = CsrMatrix::from_dense(&l, EXP_DIST_TRUNCATION * max);
    tracing::debug!(n, nnz = op.nnz(), "exp-dist operator built");
    Ok(op)
}

/// Regularized solve with the exponential-distance operator.
pub fn exp_dist(
    a: &CsrMatrix,
    b: &Array1<f64>,
    grid: &dyn GridLike,
    lambda: f64,
    gd: [[f64; 2]; 2],
    constraint: Constraint,
) -> InversionResult<Reconstruction> {
    ensure_len("exp-dist kernel columns vs grid", grid.len(), a.ncols())?;
    ensure_len("exp-dist data vector b", a.nrows(), b.len())?;
    let l = exp_dist_operator(grid, gd)?;
    TikhonovSolver::new(lambda)
        .with_constraint(constraint)
        .solve(a, b, &l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use psd_grid::Grid;
    use psd_types::config::{CutAnchor, CutLine, Spacing};
    use psd_types::state::SolveStatus;

    fn grid(n: usize) -> Grid {
        Grid::new(
            [[1.0, 1000.0], [1.0, 1000.0]],
            [n, n],
            [Spacing::Logarithmic, Spacing::Logarithmic],
        )
        .unwrap()
    }

    const ISO: [[f64; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];

    #[test]
    fn test_operator_whitens_covariance() {
        let g = grid(3);
        let sigma = exp_dist_covariance(&g, ISO).unwrap();
        let l = exp_dist_operator(&g, ISO).unwrap().to_dense();
        // Lᵀ L Σ = I
        let prod = l.t().dot(&l).dot(&sigma);
        for i in 0..9 {
            for j in 0..9 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[[i, j]] - expected).abs() < 1e-8, "({i},{j}) = {}", prod[[i, j]]);
            }
        }
    }

    #[test]
    fn test_covariance_uses_log_distance() {
        let g = grid(3);
        let s = exp_dist_covariance(&g, ISO).unwrap();
        // Neighbours along axis 1 are one decade apart
        let (k0, k1) = (g.index(0, 0), g.index(1, 0));
        assert!((s[[k0, k1]] - (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(s[[k0, k0]], 1.0);
    }

    #[test]
    fn test_anisotropic_correlation() {
        let g = grid(3);
        let gd = [[4.0, 0.0], [0.0, 0.25]];
        let s = exp_dist_covariance(&g, gd).unwrap();
        let along1 = s[[g.index(0, 0), g.index(1, 0)]];
        let along2 = s[[g.index(0, 0), g.index(0, 1)]];
        assert!((along1 - (-0.5f64).exp()).abs() < 1e-12);
        assert!((along2 - (-2.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_gd() {
        let g = grid(2);
        assert!(exp_dist_operator(&g, [[1.0, 0.0], [0.0, -1.0]]).is_err());
        assert!(exp_dist_operator(&g, [[1.0, 0.5], [0.0, 1.0]]).is_err());
        assert!(exp_dist_operator(&g, [[f64::NAN, 0.0], [0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_partial_grid_operator_shape() {
        let g = grid(4);
        let p = g
            .partial(
                CutLine {
                    anchor: CutAnchor::Intercept(0.0),
                    slope: 1.0,
                },
                None,
            )
            .unwrap();
        let l = exp_dist_operator(&p, ISO).unwrap();
        assert_eq!(l.shape(), (p.len(), p.len()));
    }

    #[test]
    fn test_exp_dist_solve_identity_kernel() {
        let g = grid(3);
        let a = CsrMatrix::identity(9);
        let x_true = Array1::from_shape_fn(9, |k| 1.0 + 0.1 * k as f64);
        let b = a.matvec(x_true.view());
        let r = exp_dist(&a, &b, &g, 1e-4, ISO, Constraint::None).unwrap();
        assert_eq!(r.diagnostics.status, SolveStatus::Direct);
        assert!(r.relative_error(&x_true) < 1e-3);
        assert!(exp_dist(&a, &b, &grid(2), 1e-4, ISO, Constraint::None).is_err());
    }
}
