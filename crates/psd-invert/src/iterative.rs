// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Iterative Solver Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sweep loop, termination policy and diagnostics shared by the
//! multiplicative solvers (Twomey, Twomey–Markowski, MART).

use ndarray::Array1;
use psd_math::linalg::norm2;
use psd_math::sparse::CsrMatrix;
use psd_types::config::SolverConfig;
use psd_types::error::{ensure_len, InversionError, InversionResult};
use psd_types::state::{information_criterion, Diagnostics, Reconstruction, SolveStatus};

#[derive(Debug, Clone)]
pub struct IterativeOptions {
    /// Sweep budget.
    pub iterations: usize,
    /// Stop once ||x_k − x_{k−1}|| / ||x_k|| falls to this value.
    pub tolerance: Option<f64>,
    /// Starting point; a uniform level matched to the data otherwise.
    pub x_init: Option<Array1<f64>>,
}

impl IterativeOptions {
    pub fn new(iterations: usize) -> Self {
        IterativeOptions {
            iterations,
            tolerance: None,
            x_init: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_initial_guess(mut self, x_init: Array1<f64>) -> Self {
        self.x_init = Some(x_init);
        self
    }
}

impl From<&SolverConfig> for IterativeOptions {
    fn from(cfg: &SolverConfig) -> Self {
        IterativeOptions {
            iterations: cfg.iterations,
            tolerance: cfg.tolerance,
            x_init: None,
        }
    }
}

/// Validate inputs and return the starting point.
pub(crate) fn prepare(
    a: &CsrMatrix,
    b: &Array1<f64>,
    opts: &IterativeOptions,
) -> InversionResult<Array1<f64>> {
    ensure_len("iterative solver data vector b", a.nrows(), b.len())?;
    if opts.iterations == 0 {
        return Err(InversionError::ConfigError(
            "iteration budget must be >= 1".to_string(),
        ));
    }
    if let Some(tol) = opts.tolerance {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(InversionError::ConfigError(format!(
                "tolerance must be finite and > 0, got {tol}"
            )));
        }
    }
    if a.iter().any(|(_, _, v)| v < 0.0 || !v.is_finite()) {
        return Err(InversionError::ConfigError(
            "multiplicative solvers need a finite non-negative kernel".to_string(),
        ));
    }

    match &opts.x_init {
        Some(x0) => {
            ensure_len("iterative solver initial guess", a.ncols(), x0.len())?;
            if x0.iter().any(|&v| v < 0.0 || !v.is_finite()) {
                return Err(InversionError::ConfigError(
                    "initial guess must be finite and non-negative".to_string(),
                ));
            }
            Ok(x0.clone())
        }
        None => {
            // x₀ = (Σb / ΣA·1) · 1 reproduces the total signal
            let total_response: f64 = a.row_sums().iter().sum();
            let level = if total_response > 0.0 {
                (b.sum() / total_response).max(0.0)
            } else {
                0.0
            };
            Ok(Array1::from_elem(a.ncols(), level))
        }
    }
}

/// Largest entry of each row.
pub(crate) fn row_maxima(a: &CsrMatrix) -> Vec<f64> {
    (0..a.nrows())
        .map(|i| a.row(i).fold(0.0_f64, |m, (_, v)| m.max(v)))
        .collect()
}

/// Run `sweep` up to the budget, recording ||A x − b|| after each sweep.
///
/// The tolerance is checked only from sweep index `first_check` on.
pub(crate) fn run<F>(
    name: &str,
    a: &CsrMatrix,
    b: &Array1<f64>,
    opts: &IterativeOptions,
    mut x: Array1<f64>,
    first_check: usize,
    mut sweep: F,
) -> Reconstruction
where
    F: FnMut(&mut Array1<f64>, usize),
{
    let mut history = Vec::with_capacity(opts.iterations);
    let mut change = f64::INFINITY;
    let mut status = match opts.tolerance {
        Some(_) => SolveStatus::NonConvergence,
        None => SolveStatus::IterationBudget,
    };
    let mut done = 0;

    for it in 0..opts.iterations {
        let x_prev = x.clone();
        sweep(&mut x, it);
        done = it + 1;

        history.push(norm2((a.matvec(x.view()) - b).view()));
        let dx = norm2((&x - &x_prev).view());
        change = dx / norm2(x.view()).max(f64::MIN_POSITIVE);

        if let Some(tol) = opts.tolerance {
            if it >= first_check && change <= tol {
                status = SolveStatus::Converged;
                break;
            }
        }
    }

    if status == SolveStatus::NonConvergence {
        tracing::warn!(solver = name, iterations = done, change, "tolerance not met");
    }

    let residual_norm = history.last().copied().unwrap_or(f64::NAN);
    let dof = x.iter().filter(|&&v| v > 0.0).count() as f64;
    tracing::debug!(solver = name, iterations = done, residual = residual_norm, ?status, "sweeps finished");

    Reconstruction {
        lambda: None,
        diagnostics: Diagnostics {
            solution_norm: norm2(x.view()),
            residual_norm,
            penalty_norm: 0.0,
            information_criterion: information_criterion(b.len(), residual_norm, dof),
            dof,
            status,
            iterations: done,
            final_change: change,
            residual_history: history,
        },
        x,
    }
}
