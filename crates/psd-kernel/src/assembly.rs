// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Kernel Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Combine device responses and charging into `A` (`n_b × Ne`).
//!
//! Per charge state `z`:
//!   K_z = ∏_devices T_d(z) ⊙ f(size_j, z)
//! entries with |K_z| ≤ threshold · max|K_z| are dropped, then
//!   A = Σ_z K_z · diag(area)
//! accumulated in the configured charge order.

use ndarray::{Array2, ArrayView2};
use psd_grid::GridLike;
use psd_math::sparse::CsrMatrix;
use psd_types::config::KernelConfig;
use psd_types::error::{ensure_len, InversionError, InversionResult};
use rayon::prelude::*;

use crate::transfer::{ChargeFraction, Setpoint, TransferFunction};

/// Assembled kernel with its per-charge-state parts.
#[derive(Debug, Clone)]
pub struct Kernel {
    contributions: Vec<(u32, CsrMatrix)>,
    combined: CsrMatrix,
}

impl Kernel {
    /// Combined `n_b × Ne` matrix.
    pub fn matrix(&self) -> &CsrMatrix {
        &self.combined
    }

    pub fn into_matrix(self) -> CsrMatrix {
        self.combined
    }

    /// Area-weighted contribution of each charge state, in accumulation order.
    pub fn contributions(&self) -> &[(u32, CsrMatrix)] {
        &self.contributions
    }

    pub fn shape(&self) -> (usize, usize) {
        self.combined.shape()
    }
}

pub struct KernelAssembler {
    config: KernelConfig,
    devices: Vec<Box<dyn TransferFunction>>,
    charging: Box<dyn ChargeFraction>,
}

impl KernelAssembler {
    pub fn new(config: KernelConfig, charging: impl ChargeFraction + 'static) -> Self {
        KernelAssembler {
            config,
            devices: Vec::new(),
            charging: Box::new(charging),
        }
    }

    /// Append a device to the measurement chain.
    pub fn with_device(mut self, device: impl TransferFunction + 'static) -> Self {
        self.devices.push(Box::new(device));
        self
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Build `A` for `setpoints` against the active elements of `grid`.
    ///
    /// `data_len` is the length of the data vector `b` this kernel will be
    /// paired with; a different setpoint count is a `SetpointMismatch`.
    pub fn assemble(
        &self,
        setpoints: &[Setpoint],
        data_len: usize,
        grid: &dyn GridLike,
    ) -> InversionResult<Kernel> {
        if setpoints.len() != data_len {
            return Err(InversionError::SetpointMismatch {
                setpoints: setpoints.len(),
                data: data_len,
            });
        }
        if self.devices.is_empty() {
            return Err(InversionError::ConfigError(
                "kernel assembly needs at least one transfer function".to_string(),
            ));
        }
        if self.config.charge_states.is_empty() {
            return Err(InversionError::ConfigError(
                "kernel.charge_states must not be empty".to_string(),
            ));
        }
        if self.config.size_axis > 1 {
            return Err(InversionError::ConfigError(format!(
                "kernel.size_axis {} out of range",
                self.config.size_axis
            )));
        }

        let elements = grid.elements();
        let area = grid.element_area();
        let (nb, ne) = (setpoints.len(), elements.nrows());

        // Charge states are independent; collect keeps the configured order.
        let contributions = self
            .config
            .charge_states
            .par_iter()
            .map(|&z| -> InversionResult<(u32, CsrMatrix)> {
                let k = self.charge_state_response(setpoints, elements.view(), z)?;
                let k = sparsify(&k, self.config.sparsity_threshold).scale_columns(
                    area.as_slice().ok_or_else(|| {
                        InversionError::ConfigError("element area not contiguous".to_string())
                    })?,
                );
                Ok((z, k))
            })
            .collect::<InversionResult<Vec<_>>>()?;

        let mut combined = CsrMatrix::zeros(nb, ne);
        for (z, k) in &contributions {
            tracing::info!(charge = *z, nnz = k.nnz(), "kernel charge-state contribution");
            combined = combined.add(k);
        }
        tracing::debug!(rows = nb, cols = ne, nnz = combined.nnz(), "kernel assembled");

        Ok(Kernel {
            contributions,
            combined,
        })
    }

    fn charge_state_response(
        &self,
        setpoints: &[Setpoint],
        elements: ArrayView2<f64>,
        charge: u32,
    ) -> InversionResult<Array2<f64>> {
        let (nb, ne) = (setpoints.len(), elements.nrows());
        let mut k = Array2::from_elem((nb, ne), 1.0);
        for device in &self.devices {
            let r = device.evaluate(setpoints, elements, charge);
            if r.dim() != (nb, ne) {
                return Err(InversionError::DimensionMismatch {
                    context: format!("transfer function '{}' output", device.name()),
                    expected: nb * ne,
                    found: r.len(),
                });
            }
            k *= &r;
        }
        for (j, mut col) in k.columns_mut().into_iter().enumerate() {
            let f = self
                .charging
                .fraction(elements[[j, self.config.size_axis]], charge);
            col *= f;
        }
        Ok(k)
    }
}

/// Drop entries at or below `threshold` times the largest magnitude.
fn sparsify(k: &Array2<f64>, threshold: f64) -> CsrMatrix {
    let max = k.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    CsrMatrix::from_dense(k, threshold * max)
}

/// Rebase a kernel built on `fine` onto `coarse`: `A · T(coarse → fine)`.
pub fn rebase_kernel(
    a: &CsrMatrix,
    fine: &dyn GridLike,
    coarse: &dyn GridLike,
) -> InversionResult<CsrMatrix> {
    ensure_len("rebase_kernel columns", fine.len(), a.ncols())?;
    Ok(a.matmul(&fine.transform(coarse)))
}
