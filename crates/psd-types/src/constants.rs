// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Charge states summed into the kernel unless configured otherwise.
pub const DEFAULT_CHARGE_STATES: [u32; 3] = [1, 2, 3];

/// Kernel entries below this fraction of the per-charge-state maximum are dropped.
pub const DEFAULT_SPARSITY_THRESHOLD: f64 = 1e-7;

/// Offset applied to cut-line comparisons. Upper cuts subtract it, lower cuts add it.
pub const CUT_EPSILON: f64 = 1e-10;

/// Relative singular value cutoff for minimum-norm fallbacks.
pub const SV_RELATIVE_CUTOFF: f64 = 1e-12;

/// Predicted signals below this are skipped by the multiplicative solvers.
pub const MIN_PREDICTED_SIGNAL: f64 = 1e-300;

/// Exponential-distance operator entries below this fraction of the
/// largest magnitude are dropped.
pub const EXP_DIST_TRUNCATION: f64 = 1e-10;
