// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Twomey
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Twomey's multiplicative relaxation and the Markowski smoothed variant.
//!
//! For each data point i with prediction pᵢ = Aᵢ·x > 0 and yᵢ = bᵢ / pᵢ:
//!   xⱼ ← xⱼ · max(0, 1 + (yᵢ − 1) · aᵢⱼ / maxⱼ aᵢⱼ)
//! applied row by row with the running x. One pass over all rows is a sweep.

use ndarray::Array1;
use psd_grid::GridLike;
use psd_math::sparse::CsrMatrix;
use psd_types::constants::MIN_PREDICTED_SIGNAL;
use psd_types::error::{ensure_len, InversionResult};
use psd_types::state::Reconstruction;

use crate::iterative::{prepare, row_maxima, run, IterativeOptions};

fn twomey_sweep(a: &CsrMatrix, b: &Array1<f64>, row_max: &[f64], x: &mut Array1<f64>) {
    for i in 0..a.nrows() {
        let amax = row_max[i];
        if amax <= 0.0 {
            continue;
        }
        let pred: f64 = a.row(i).map(|(j, v)| v * x[j]).sum();
        if pred <= MIN_PREDICTED_SIGNAL {
            continue;
        }
        let y = b[i] / pred;
        for (j, v) in a.row(i) {
            x[j] *= (1.0 + (y - 1.0) * v / amax).max(0.0);
        }
    }
}

/// Replace each element by the mean of itself and its neighbours' mean.
fn smooth(adj: &CsrMatrix, degree: &[f64], x: &Array1<f64>) -> Array1<f64> {
    let neighbour_sum = adj.matvec(x.view());
    Array1::from_shape_fn(x.len(), |k| {
        if degree[k] > 0.0 {
            0.5 * x[k] + 0.5 * neighbour_sum[k] / degree[k]
        } else {
            x[k]
        }
    })
}

/// Twomey inversion of `b ≈ A x` with x ≥ 0.
pub fn twomey(a: &CsrMatrix, b: &Array1<f64>, opts: &IterativeOptions) -> InversionResult<Reconstruction> {
    let x0 = prepare(a, b, opts)?;
    let row_max = row_maxima(a);
    Ok(run("twomey", a, b, opts, x0, 0, |x, _| {
        twomey_sweep(a, b, &row_max, x)
    }))
}

/// Twomey sweeps followed by adjacency smoothing for the first
/// `smoothing_passes` sweeps, then plain Twomey for the rest.
///
/// The tolerance is not checked while smoothing is active.
pub fn twomey_markowski(
    a: &CsrMatrix,
    b: &Array1<f64>,
    grid: &dyn GridLike,
    opts: &IterativeOptions,
    smoothing_passes: usize,
) -> InversionResult<Reconstruction> {
    ensure_len("Twomey-Markowski kernel columns vs grid", grid.len(), a.ncols())?;
    let x0 = prepare(a, b, opts)?;
    let row_max = row_maxima(a);
    let adj = grid.adjacency();
    let degree = adj.row_sums();
    Ok(run("twomey_markowski", a, b, opts, x0, smoothing_passes, |x, it| {
        twomey_sweep(a, b, &row_max, x);
        if it < smoothing_passes {
            *x = smooth(&adj, &degree, x);
        }
    }))
}
