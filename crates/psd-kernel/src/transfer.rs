// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Transfer Functions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Capability contracts for instrument response and particle charging.

use ndarray::{Array2, ArrayView2};
use psd_grid::GridLike;
use psd_types::config::Spacing;

/// One measurement: the pair of classifier settings at which it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    /// Selected particle mass (grid axis 1 units).
    pub mass: f64,
    /// Selected mobility diameter (grid axis 2 units).
    pub mobility_diameter: f64,
}

impl Setpoint {
    pub fn new(mass: f64, mobility_diameter: f64) -> Self {
        Setpoint {
            mass,
            mobility_diameter,
        }
    }

    /// Coordinates in grid-axis order.
    #[inline]
    pub fn coords(&self) -> [f64; 2] {
        [self.mass, self.mobility_diameter]
    }

    /// One setpoint at every active element centre of `grid`.
    pub fn from_grid(grid: &dyn GridLike) -> Vec<Setpoint> {
        let el = grid.elements();
        el.rows()
            .into_iter()
            .map(|r| Setpoint::new(r[0], r[1]))
            .collect()
    }
}

/// Response of one device in the measurement chain.
///
/// `evaluate` returns an `n_setpoints × n_elements` matrix of detection
/// probabilities for particles carrying `charge` elementary charges.
/// `elements` is the `n_elements × 2` matrix of element centres.
/// Implementations must be pure functions of their inputs.
pub trait TransferFunction: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, setpoints: &[Setpoint], elements: ArrayView2<f64>, charge: u32) -> Array2<f64>;
}

/// Fraction of particles of a given size that carry `charge` charges.
pub trait ChargeFraction: Send + Sync {
    fn fraction(&self, size: f64, charge: u32) -> f64;
}

impl<F> ChargeFraction for F
where
    F: Fn(f64, u32) -> f64 + Send + Sync,
{
    fn fraction(&self, size: f64, charge: u32) -> f64 {
        self(size, charge)
    }
}

/// Gaussian response along one axis in the transformed space.
///
/// A particle of charge `z` appears at `coordinate / z^shift`, so
/// multiply-charged particles leak into lower setpoints when `shift > 0`.
/// This is a stand-in device for tests and benchmarks, not a physical model.
#[derive(Debug, Clone)]
pub struct GaussianTransfer {
    pub axis: usize,
    pub spacing: Spacing,
    /// Standard deviation in the transformed space.
    pub width: f64,
    pub shift: f64,
}

impl GaussianTransfer {
    pub fn new(axis: usize, spacing: Spacing, width: f64) -> Self {
        GaussianTransfer {
            axis,
            spacing,
            width,
            shift: 0.0,
        }
    }

    pub fn with_charge_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }
}

impl TransferFunction for GaussianTransfer {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn evaluate(&self, setpoints: &[Setpoint], elements: ArrayView2<f64>, charge: u32) -> Array2<f64> {
        let n_el = elements.nrows();
        let z = (charge.max(1) as f64).powf(self.shift);
        let inv_w2 = 1.0 / (self.width * self.width);
        let t_el: Vec<f64> = (0..n_el)
            .map(|j| self.spacing.forward(elements[[j, self.axis]] / z))
            .collect();
        Array2::from_shape_fn((setpoints.len(), n_el), |(i, j)| {
            let t_sp = self.spacing.forward(setpoints[i].coords()[self.axis]);
            let d = t_el[j] - t_sp;
            (-0.5 * d * d * inv_w2).exp()
        })
    }
}
