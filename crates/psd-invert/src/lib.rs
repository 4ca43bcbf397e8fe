// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inversion of `b ≈ A x` on a [`GridLike`] discretization.
//!
//! Direct solvers (Tikhonov, exponential-distance) and multiplicative
//! iterative solvers (Twomey, Twomey–Markowski, MART). Every call returns a
//! fresh [`Reconstruction`]; nothing is mutated in place.

pub mod exp_dist;
pub mod iterative;
pub mod mart;
pub mod regularization;
pub mod sweep;
pub mod tikhonov;
pub mod twomey;

pub use exp_dist::{exp_dist, exp_dist_covariance, exp_dist_operator};
pub use iterative::IterativeOptions;
pub use mart::mart;
pub use regularization::{order0_operator, order1_operator, order2_operator, tikhonov_operator};
pub use sweep::{best_by_reference, log_lambdas, sweep_iterations, sweep_lambda, sweep_parallel};
pub use tikhonov::{tikhonov, TikhonovSolver};
pub use twomey::{twomey, twomey_markowski};

use ndarray::Array1;
use psd_grid::GridLike;
use psd_math::nnls::NnlsConfig;
use psd_math::sparse::CsrMatrix;
use psd_types::config::{SolverConfig, SolverMethod};
use psd_types::error::{ensure_len, InversionError, InversionResult};
use psd_types::state::Reconstruction;

/// Run the solver selected by `cfg.method`.
pub fn invert(
    a: &CsrMatrix,
    b: &Array1<f64>,
    grid: &dyn GridLike,
    cfg: &SolverConfig,
) -> InversionResult<Reconstruction> {
    cfg.validate()?;
    ensure_len("kernel columns vs grid", grid.len(), a.ncols())?;
    ensure_len("data vector b", a.nrows(), b.len())?;

    tracing::debug!(method = ?cfg.method, n_data = b.len(), n_elements = grid.len(), "inverting");

    let nnls = NnlsConfig {
        max_iterations: cfg.nnls_max_iterations,
        tolerance: cfg.nnls_tolerance,
    };

    match cfg.method {
        SolverMethod::Tikhonov => TikhonovSolver::new(cfg.lambda)
            .with_constraint(cfg.constraint)
            .with_nnls(nnls)
            .solve_on_grid(a, b, grid, cfg.order),
        SolverMethod::ExpDist => {
            let gd = cfg.gd.ok_or_else(|| {
                InversionError::ConfigError("solver.gd is required for exp_dist".to_string())
            })?;
            let l = exp_dist_operator(grid, gd)?;
            TikhonovSolver::new(cfg.lambda)
                .with_constraint(cfg.constraint)
                .with_nnls(nnls)
                .solve(a, b, &l)
        }
        SolverMethod::Twomey => twomey(a, b, &IterativeOptions::from(cfg)),
        SolverMethod::TwomeyMarkowski => {
            twomey_markowski(a, b, grid, &IterativeOptions::from(cfg), cfg.smoothing_passes)
        }
        SolverMethod::Mart => mart(a, b, &IterativeOptions::from(cfg), cfg.relaxation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psd_grid::Grid;
    use psd_types::config::{Constraint, Spacing};
    use psd_types::state::SolveStatus;

    fn setup() -> (Grid, CsrMatrix, Array1<f64>, Array1<f64>) {
        let g = Grid::new([[1.0, 100.0], [1.0, 100.0]], [4, 4], [Spacing::Logarithmic; 2]).unwrap();
        let a = CsrMatrix::identity(16).add(&g.adjacency().scale(0.1));
        let x = Array1::from_shape_fn(16, |k| 1.0 + 0.05 * k as f64);
        let b = a.matvec(x.view());
        (g, a, b, x)
    }

    #[test]
    fn test_dispatch_every_method() {
        let (g, a, b, x) = setup();
        for method in [
            SolverMethod::Tikhonov,
            SolverMethod::ExpDist,
            SolverMethod::Twomey,
            SolverMethod::TwomeyMarkowski,
            SolverMethod::Mart,
        ] {
            let mut cfg = SolverConfig::new(method);
            cfg.lambda = 1e-3;
            cfg.gd = Some([[1.0, 0.0], [0.0, 1.0]]);
            cfg.smoothing_passes = 2;
            let r = invert(&a, &b, &g, &cfg).unwrap();
            assert_eq!(r.x.len(), 16, "{method:?}");
            assert!(r.relative_error(&x) < 0.05, "{method:?}: {}", r.relative_error(&x));
        }
    }

    #[test]
    fn test_dispatch_statuses() {
        let (g, a, b, _) = setup();
        let r = invert(&a, &b, &g, &SolverConfig::new(SolverMethod::Tikhonov)).unwrap();
        assert_eq!(r.diagnostics.status, SolveStatus::Direct);
        assert!(r.lambda.is_some());

        let mut cfg = SolverConfig::new(SolverMethod::Tikhonov);
        cfg.constraint = Constraint::NonNegative;
        let r = invert(&a, &b, &g, &cfg).unwrap();
        assert!(r.x.iter().all(|&v| v >= 0.0));

        let r = invert(&a, &b, &g, &SolverConfig::new(SolverMethod::Mart)).unwrap();
        assert_eq!(r.diagnostics.status, SolveStatus::IterationBudget);
        assert_eq!(r.diagnostics.iterations, 100);
        assert!(r.lambda.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (g, a, b, _) = setup();
        let cfg = SolverConfig::new(SolverMethod::ExpDist);
        assert!(matches!(invert(&a, &b, &g, &cfg), Err(InversionError::ConfigError(_))));
        let mut cfg = SolverConfig::new(SolverMethod::Tikhonov);
        cfg.order = 3;
        assert!(invert(&a, &b, &g, &cfg).is_err());
    }

    #[test]
    fn test_grid_mismatch_rejected() {
        let (_, a, b, _) = setup();
        let small = Grid::new([[1.0, 100.0], [1.0, 100.0]], [3, 3], [Spacing::Logarithmic; 2]).unwrap();
        assert!(matches!(
            invert(&a, &b, &small, &SolverConfig::new(SolverMethod::Twomey)),
            Err(InversionError::DimensionMismatch { expected: 9, found: 16, .. })
        ));
    }
}
