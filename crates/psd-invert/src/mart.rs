// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — MART
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multiplicative algebraic reconstruction.
//!
//! xⱼ ← xⱼ · yᵢ^(ω · aᵢⱼ / max A), yᵢ = max(bᵢ, 0) / (Aᵢ·x)
//!
//! Unlike Twomey the exponent is normalized by the largest kernel entry
//! overall, so ω is a single global step size.

use ndarray::Array1;
use psd_math::sparse::CsrMatrix;
use psd_types::constants::MIN_PREDICTED_SIGNAL;
use psd_types::error::{InversionError, InversionResult};
use psd_types::state::Reconstruction;

use crate::iterative::{prepare, run, IterativeOptions};

fn mart_sweep(a: &CsrMatrix, b: &Array1<f64>, step: f64, x: &mut Array1<f64>) {
    for i in 0..a.nrows() {
        let pred: f64 = a.row(i).map(|(j, v)| v * x[j]).sum();
        if pred <= MIN_PREDICTED_SIGNAL {
            continue;
        }
        let y = b[i].max(0.0) / pred;
        for (j, v) in a.row(i) {
            x[j] *= y.powf(step * v);
        }
    }
}

/// MART inversion with relaxation `omega` in (0, ∞).
pub fn mart(
    a: &CsrMatrix,
    b: &Array1<f64>,
    opts: &IterativeOptions,
    omega: f64,
) -> InversionResult<Reconstruction> {
    if !omega.is_finite() || omega <= 0.0 {
        return Err(InversionError::ConfigError(format!(
            "MART relaxation must be finite and > 0, got {omega}"
        )));
    }
    let x0 = prepare(a, b, opts)?;
    let amax = a.max_value();
    let step = if amax > 0.0 { omega / amax } else { 0.0 };
    Ok(run("mart", a, b, opts, x0, 0, |x, _| mart_sweep(a, b, step, x)))
}
