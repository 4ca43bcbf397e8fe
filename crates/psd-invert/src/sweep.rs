// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Parameter Sweeps
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Independent solves over a parameter list, run on the rayon pool.
//!
//! Each entry of the result corresponds to the same position in the input
//! list; a failed solve does not stop the others.

use ndarray::Array1;
use psd_types::error::InversionResult;
use psd_types::state::Reconstruction;
use rayon::prelude::*;

/// Run `solve` once per parameter value, in parallel, preserving order.
pub fn sweep_parallel<P, F>(params: &[P], solve: F) -> Vec<InversionResult<Reconstruction>>
where
    P: Sync,
    F: Fn(&P) -> InversionResult<Reconstruction> + Sync + Send,
{
    params.par_iter().map(&solve).collect()
}

/// Run a λ-parameterised solve across `lambdas`.
pub fn sweep_lambda<F>(lambdas: &[f64], solve: F) -> Vec<InversionResult<Reconstruction>>
where
    F: Fn(f64) -> InversionResult<Reconstruction> + Sync + Send,
{
    let results = sweep_parallel(lambdas, |&lam| solve(lam));
    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::debug!(points = lambdas.len(), failed, "lambda sweep finished");
    results
}

/// Run an iteration-count-parameterised solve across `budgets`.
pub fn sweep_iterations<F>(budgets: &[usize], solve: F) -> Vec<InversionResult<Reconstruction>>
where
    F: Fn(usize) -> InversionResult<Reconstruction> + Sync + Send,
{
    sweep_parallel(budgets, |&n| solve(n))
}

/// Logarithmically spaced λ values from `lo` to `hi` inclusive.
pub fn log_lambdas(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let (a, b) = (lo.log10(), hi.log10());
            (0..n)
                .map(|k| 10f64.powf(a + (b - a) * k as f64 / (n - 1) as f64))
                .collect()
        }
    }
}

/// Index and result with the smallest relative error against `x_ref`.
///
/// Results whose length differs from `x_ref` or whose error is not finite
/// are skipped.
pub fn best_by_reference<'a>(
    results: &'a [Reconstruction],
    x_ref: &Array1<f64>,
) -> Option<(usize, &'a Reconstruction)> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.x.len() == x_ref.len())
        .map(|(k, r)| (k, r, r.relative_error(x_ref)))
        .filter(|(_, _, e)| e.is_finite())
        .min_by(|p, q| p.2.total_cmp(&q.2))
        .map(|(k, r, _)| (k, r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tikhonov::TikhonovSolver;
    use ndarray::array;
    use psd_math::sparse::CsrMatrix;

    fn problem() -> (CsrMatrix, Array1<f64>, Array1<f64>) {
        let a = CsrMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 1.0), (0, 1, 0.5), (1, 1, 1.0), (1, 2, 0.5), (2, 2, 1.0)],
        );
        let x = array![1.0, 2.0, 3.0];
        let b = a.matvec(x.view());
        (a, b, x)
    }

    #[test]
    fn test_log_lambdas() {
        let l = log_lambdas(1e-3, 1e1, 5);
        assert_eq!(l.len(), 5);
        assert!((l[0] - 1e-3).abs() < 1e-15);
        assert!((l[2] - 1e-1).abs() < 1e-12);
        assert!((l[4] - 10.0).abs() < 1e-10);
        assert!(log_lambdas(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn test_sweep_preserves_order() {
        let (a, b, _) = problem();
        let l = CsrMatrix::identity(3);
        let lambdas = log_lambdas(1e-4, 1e2, 8);
        let results = sweep_lambda(&lambdas, |lam| TikhonovSolver::new(lam).solve(&a, &b, &l));
        assert_eq!(results.len(), lambdas.len());
        for (r, &lam) in results.iter().zip(&lambdas) {
            assert_eq!(r.as_ref().unwrap().lambda, Some(lam));
        }
        // Order-0 penalty shrinks the solution as λ grows
        let norms: Vec<f64> = results
            .iter()
            .map(|r| r.as_ref().unwrap().diagnostics.solution_norm)
            .collect();
        assert!(norms.windows(2).all(|w| w[1] <= w[0] + 1e-12));
    }

    #[test]
    fn test_sweep_keeps_failures_in_place() {
        let (a, b, _) = problem();
        let l = CsrMatrix::identity(3);
        let results = sweep_lambda(&[0.1, -1.0, 1.0], |lam| TikhonovSolver::new(lam).solve(&a, &b, &l));
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_best_by_reference_picks_small_lambda() {
        let (a, b, x) = problem();
        let l = CsrMatrix::identity(3);
        let results: Vec<Reconstruction> = sweep_lambda(&[10.0, 1e-6, 1.0], |lam| {
            TikhonovSolver::new(lam).solve(&a, &b, &l)
        })
        .into_iter()
        .collect::<InversionResult<_>>()
        .unwrap();
        let (k, best) = best_by_reference(&results, &x).unwrap();
        assert_eq!(k, 1);
        assert!(best.relative_error(&x) < 1e-6);
        assert!(best_by_reference(&results, &array![1.0]).is_none());
    }

    #[test]
    fn test_sweep_iterations() {
        let a = CsrMatrix::identity(2);
        let b = array![1.0, 3.0];
        let results = sweep_iterations(&[1, 2, 5], |n| {
            crate::twomey::twomey(&a, &b, &crate::iterative::IterativeOptions::new(n))
        });
        let counts: Vec<usize> = results
            .iter()
            .map(|r| r.as_ref().unwrap().diagnostics.iterations)
            .collect();
        assert_eq!(counts, vec![1, 2, 5]);
    }
}
