// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Forward model: setpoints × grid elements → sparse kernel matrix `A`.
//!
//! Device physics stays outside this crate. Callers plug in
//! [`TransferFunction`] and [`ChargeFraction`] implementations; assembly
//! combines them per charge state, sparsifies, and weights by element area.

pub mod assembly;
pub mod noise;
pub mod transfer;

pub use assembly::{rebase_kernel, Kernel, KernelAssembler};
pub use noise::NoiseModel;
pub use transfer::{ChargeFraction, GaussianTransfer, Setpoint, TransferFunction};
