// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Tikhonov
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Regularized least squares.
//!
//! Solves min ||A x − b||² + λ² ||L (x − x_p)||² through the augmented
//! system `[A; λL] x = [b; λ L x_p]`.
//!
//! Unconstrained solves factor the normal equations AᵀA + λ²LᵀL by
//! Cholesky. If the factorization fails the augmented system is solved
//! by minimum-norm least squares instead and the status says so.
//! Non-negative solves run projected-gradient NNLS on the augmented system.

use ndarray::Array1;
use psd_grid::GridLike;
use psd_math::linalg::{cholesky, cholesky_solve, lstsq_min_norm, norm2};
use psd_math::nnls::{nnls_projected_gradient, NnlsConfig};
use psd_math::sparse::CsrMatrix;
use psd_types::config::Constraint;
use psd_types::constants::SV_RELATIVE_CUTOFF;
use psd_types::error::{ensure_len, InversionError, InversionResult};
use psd_types::state::{information_criterion, Diagnostics, Reconstruction, SolveStatus};

use crate::regularization::tikhonov_operator;

#[derive(Debug, Clone)]
pub struct TikhonovSolver {
    pub lambda: f64,
    pub constraint: Constraint,
    /// Prior mean; the penalty acts on `x − x_prior`.
    pub x_prior: Option<Array1<f64>>,
    pub nnls: NnlsConfig,
}

impl TikhonovSolver {
    pub fn new(lambda: f64) -> Self {
        TikhonovSolver {
            lambda,
            constraint: Constraint::None,
            x_prior: None,
            nnls: NnlsConfig::default(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_prior(mut self, x_prior: Array1<f64>) -> Self {
        self.x_prior = Some(x_prior);
        self
    }

    pub fn with_nnls(mut self, nnls: NnlsConfig) -> Self {
        self.nnls = nnls;
        self
    }

    /// Solve with an explicit penalty operator `l` (`m × Ne`).
    pub fn solve(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        l: &CsrMatrix,
    ) -> InversionResult<Reconstruction> {
        let n = a.ncols();
        ensure_len("Tikhonov data vector b", a.nrows(), b.len())?;
        ensure_len("Tikhonov operator L columns", n, l.ncols())?;
        if let Some(p) = &self.x_prior {
            ensure_len("Tikhonov prior", n, p.len())?;
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(InversionError::ConfigError(format!(
                "lambda must be finite and >= 0, got {}",
                self.lambda
            )));
        }

        let lam = self.lambda;
        // λ L x_p, the penalty block of the augmented right-hand side
        let penalty_rhs = match &self.x_prior {
            Some(p) => l.matvec(p.view()) * lam,
            None => Array1::zeros(l.nrows()),
        };

        let (x, dof, status, iterations, final_change) = match self.constraint {
            Constraint::None => {
                let (x, dof, status) = self.solve_unconstrained(a, b, l, &penalty_rhs);
                (x, dof, status, 0, 0.0)
            }
            Constraint::NonNegative => {
                let a_aug = a.vstack(&l.scale(lam));
                let b_aug = stack(b, &penalty_rhs);
                let r = nnls_projected_gradient(&a_aug, &b_aug, None, &self.nnls);
                let status = if r.converged {
                    SolveStatus::Converged
                } else {
                    tracing::warn!(
                        iterations = r.iterations,
                        change = r.final_change,
                        "non-negative Tikhonov solve did not meet tolerance"
                    );
                    SolveStatus::NonConvergence
                };
                let active = r.x.iter().filter(|&&v| v > 0.0).count() as f64;
                (r.x, active, status, r.iterations, r.final_change)
            }
        };

        let residual_norm = norm2((a.matvec(x.view()) - b).view());
        let penalty = match &self.x_prior {
            Some(p) => l.matvec((&x - p).view()),
            None => l.matvec(x.view()),
        };
        let penalty_norm = norm2(penalty.view());

        tracing::debug!(
            lambda = lam,
            residual = residual_norm,
            penalty = penalty_norm,
            ?status,
            "Tikhonov solve"
        );

        Ok(Reconstruction {
            lambda: Some(lam),
            diagnostics: Diagnostics {
                solution_norm: norm2(x.view()),
                residual_norm,
                penalty_norm,
                information_criterion: information_criterion(b.len(), residual_norm, dof),
                dof,
                status,
                iterations,
                final_change,
                residual_history: Vec::new(),
            },
            x,
        })
    }

    /// Solve with the order-`order` difference operator of `grid`.
    pub fn solve_on_grid(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        grid: &dyn GridLike,
        order: u8,
    ) -> InversionResult<Reconstruction> {
        ensure_len("Tikhonov kernel columns vs grid", grid.len(), a.ncols())?;
        let l = tikhonov_operator(grid, order)?;
        self.solve(a, b, &l)
    }

    fn solve_unconstrained(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        l: &CsrMatrix,
        penalty_rhs: &Array1<f64>,
    ) -> (Array1<f64>, f64, SolveStatus) {
        let lam = self.lambda;
        let ata = a.gram();
        let normal = &ata + &(l.gram() * (lam * lam));
        let rhs = a.transpose_matvec(b.view()) + l.transpose_matvec(penalty_rhs.view()) * lam;

        if let Some(c) = cholesky(&normal) {
            let x = cholesky_solve(&c, rhs.view());
            if x.iter().all(|v| v.is_finite()) {
                // dof = tr((AᵀA + λ²LᵀL)⁻¹ AᵀA)
                let dof: f64 = (0..ata.ncols())
                    .map(|j| cholesky_solve(&c, ata.column(j))[j])
                    .sum();
                return (x, dof, SolveStatus::Direct);
            }
        }

        tracing::warn!(
            lambda = lam,
            "normal equations not positive definite, using minimum-norm least squares"
        );
        let a_aug = a.vstack(&l.scale(lam)).to_dense();
        let b_aug = stack(b, penalty_rhs);
        let (x, rank) = lstsq_min_norm(&a_aug, b_aug.view(), SV_RELATIVE_CUTOFF);
        (x, rank as f64, SolveStatus::MinNormFallback)
    }
}

/// `[top; bottom]`
fn stack(top: &Array1<f64>, bottom: &Array1<f64>) -> Array1<f64> {
    top.iter().chain(bottom.iter()).copied().collect()
}

/// Tikhonov solve of order 0, 1 or 2 on `grid`.
pub fn tikhonov(
    a: &CsrMatrix,
    b: &Array1<f64>,
    grid: &dyn GridLike,
    lambda: f64,
    order: u8,
    constraint: Constraint,
) -> InversionResult<Reconstruction> {
    TikhonovSolver::new(lambda)
        .with_constraint(constraint)
        .solve_on_grid(a, b, grid, order)
}
