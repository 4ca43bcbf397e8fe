// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array1;

use crate::error::InversionError;

/// Which path produced a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Normal equations factored and solved directly.
    Direct,
    /// Normal equations were singular or indefinite; minimum-norm least squares was used.
    MinNormFallback,
    /// Iterative solve met its tolerance.
    Converged,
    /// Fixed iteration budget ran out with no tolerance requested.
    IterationBudget,
    /// A tolerance was requested and not met within the budget.
    NonConvergence,
}

impl SolveStatus {
    /// True when the full normal-equations solve did not run.
    pub fn is_fallback(self) -> bool {
        matches!(self, SolveStatus::MinNormFallback)
    }

    /// Escalate a flagged status into the matching error, for callers that
    /// want degraded solves to abort.
    pub fn as_error(self, diagnostics: &Diagnostics) -> Option<InversionError> {
        match self {
            SolveStatus::MinNormFallback => Some(InversionError::SingularSystem(
                "normal equations not positive definite".to_string(),
            )),
            SolveStatus::NonConvergence => Some(InversionError::NonConvergence {
                iterations: diagnostics.iterations,
                change: diagnostics.final_change,
            }),
            _ => None,
        }
    }
}

/// Scalars reported alongside every reconstruction.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// ||x||₂
    pub solution_norm: f64,
    /// ||A x − b||₂
    pub residual_norm: f64,
    /// ||L x||₂, zero for solvers without an operator.
    pub penalty_norm: f64,
    /// AIC-style proxy: n_b · ln(RSS / n_b) + 2 · dof.
    pub information_criterion: f64,
    /// Effective degrees of freedom used in the criterion: the trace of the
    /// influence matrix for `Direct`, the kept rank for `MinNormFallback`,
    /// and the count of strictly positive entries of x for NNLS and the
    /// multiplicative solvers.
    pub dof: f64,
    pub status: SolveStatus,
    /// Sweeps (iterative solvers) or projected-gradient steps (NNLS); 0 for direct solves.
    pub iterations: usize,
    /// Relative change of x at the last iteration; 0 for direct solves.
    pub final_change: f64,
    /// ||A x − b|| after each sweep of an iterative solver.
    pub residual_history: Vec<f64>,
}

/// One reconstructed distribution.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Solution on the grid used to build A.
    pub x: Array1<f64>,
    /// λ used, if the method has one.
    pub lambda: Option<f64>,
    pub diagnostics: Diagnostics,
}

impl Reconstruction {
    /// ||x − x_ref|| / ||x_ref||
    pub fn relative_error(&self, x_ref: &Array1<f64>) -> f64 {
        let num = (&self.x - x_ref).mapv(|v| v * v).sum().sqrt();
        let den = x_ref.mapv(|v| v * v).sum().sqrt();
        if den > 0.0 {
            num / den
        } else {
            num
        }
    }
}

/// AIC-style information criterion from a residual norm and degrees of freedom.
pub fn information_criterion(n_data: usize, residual_norm: f64, dof: f64) -> f64 {
    let n = n_data.max(1) as f64;
    let rss = residual_norm * residual_norm;
    n * (rss / n + f64::MIN_POSITIVE).ln() + 2.0 * dof
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(status: SolveStatus) -> Diagnostics {
        Diagnostics {
            solution_norm: 1.0,
            residual_norm: 0.5,
            penalty_norm: 0.0,
            information_criterion: 0.0,
            dof: 1.0,
            status,
            iterations: 7,
            final_change: 0.25,
            residual_history: vec![],
        }
    }

    #[test]
    fn test_fallback_status_escalates() {
        let d = diag(SolveStatus::MinNormFallback);
        assert!(d.status.is_fallback());
        assert!(matches!(
            d.status.as_error(&d),
            Some(InversionError::SingularSystem(_))
        ));
    }

    #[test]
    fn test_non_convergence_carries_iterations() {
        let d = diag(SolveStatus::NonConvergence);
        match d.status.as_error(&d) {
            Some(InversionError::NonConvergence { iterations, change }) => {
                assert_eq!(iterations, 7);
                assert!((change - 0.25).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_clean_statuses_do_not_escalate() {
        for s in [
            SolveStatus::Direct,
            SolveStatus::Converged,
            SolveStatus::IterationBudget,
        ] {
            assert!(s.as_error(&diag(s)).is_none());
            assert!(!s.is_fallback());
        }
    }

    #[test]
    fn test_relative_error() {
        let r = Reconstruction {
            x: Array1::from_vec(vec![1.0, 2.0, 2.0]),
            lambda: None,
            diagnostics: diag(SolveStatus::Direct),
        };
        let x_ref = Array1::from_vec(vec![1.0, 2.0, 2.0]);
        assert!(r.relative_error(&x_ref) < 1e-15);
        let x_ref2 = Array1::from_vec(vec![0.0, 0.0, 3.0]);
        // diff = (1, 2, -1): sqrt(6) / 3
        assert!((r.relative_error(&x_ref2) - 6f64.sqrt() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_information_criterion_penalises_dof() {
        let a = information_criterion(10, 1.0, 2.0);
        let b = information_criterion(10, 1.0, 5.0);
        assert!((b - a - 6.0).abs() < 1e-12);
    }
}
