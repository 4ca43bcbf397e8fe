// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHARGE_STATES, DEFAULT_SPARSITY_THRESHOLD};
use crate::error::{InversionError, InversionResult};

/// Top-level inversion configuration.
/// Maps 1:1 to the `configs/*.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InversionConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub kernel: KernelConfig,
    pub solver: SolverConfig,
}

/// Node spacing along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    Linear,
    Logarithmic,
}

impl Spacing {
    /// Map a physical coordinate into the space where the axis is uniform.
    #[inline]
    pub fn forward(self, v: f64) -> f64 {
        match self {
            Spacing::Linear => v,
            Spacing::Logarithmic => v.log10(),
        }
    }

    /// Inverse of [`Spacing::forward`].
    #[inline]
    pub fn inverse(self, t: f64) -> f64 {
        match self {
            Spacing::Linear => t,
            Spacing::Logarithmic => 10f64.powf(t),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// `[[axis1_min, axis1_max], [axis2_min, axis2_max]]`
    pub span: [[f64; 2]; 2],
    /// Element count per axis.
    pub ne: [usize; 2],
    pub spacing: [Spacing; 2],
    /// Optional triangular cut turning the grid into a partial grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut: Option<CutConfig>,
}

/// How a cut line is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutAnchor {
    /// Intercept already expressed in the grid's transformed (log10 or linear) space.
    Intercept(f64),
    /// A point `[axis1, axis2]` in physical coordinates that the line passes through.
    Point([f64; 2]),
}

/// Line `t1 = b + slope * t2` in transformed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutLine {
    pub anchor: CutAnchor,
    #[serde(default = "default_slope")]
    pub slope: f64,
}

fn default_slope() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutConfig {
    /// Elements entirely above this line are removed.
    pub upper: CutLine,
    /// Elements entirely below this line are removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<CutLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Charge states, accumulated in this order.
    #[serde(default = "default_charge_states")]
    pub charge_states: Vec<u32>,
    /// Relative threshold below which per-charge-state entries are zeroed.
    #[serde(default = "default_sparsity_threshold")]
    pub sparsity_threshold: f64,
    /// Grid axis (0 or 1) whose element coordinate is passed to the charging model.
    #[serde(default = "default_size_axis")]
    pub size_axis: usize,
}

fn default_charge_states() -> Vec<u32> {
    DEFAULT_CHARGE_STATES.to_vec()
}
fn default_sparsity_threshold() -> f64 {
    DEFAULT_SPARSITY_THRESHOLD
}
fn default_size_axis() -> usize {
    1
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            charge_states: default_charge_states(),
            sparsity_threshold: default_sparsity_threshold(),
            size_axis: default_size_axis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    Tikhonov,
    ExpDist,
    Twomey,
    TwomeyMarkowski,
    Mart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    #[default]
    None,
    NonNegative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Regularization parameter λ (Tikhonov, exp-dist).
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Tikhonov order: 0, 1 or 2.
    #[serde(default = "default_order")]
    pub order: u8,
    #[serde(default)]
    pub constraint: Constraint,
    /// Sweep budget for Twomey, Twomey-Markowski and MART.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Optional early exit on relative change of x (iterative solvers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    /// MART relaxation ω.
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,
    /// Smoothing passes for Twomey-Markowski.
    #[serde(default = "default_smoothing_passes")]
    pub smoothing_passes: usize,
    /// Correlation covariance for the exponential-distance operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gd: Option<[[f64; 2]; 2]>,
    #[serde(default = "default_nnls_max_iterations")]
    pub nnls_max_iterations: usize,
    #[serde(default = "default_nnls_tolerance")]
    pub nnls_tolerance: f64,
}

fn default_lambda() -> f64 {
    1.0
}
fn default_order() -> u8 {
    1
}
fn default_iterations() -> usize {
    100
}
fn default_relaxation() -> f64 {
    1.0
}
fn default_smoothing_passes() -> usize {
    10
}
fn default_nnls_max_iterations() -> usize {
    5000
}
fn default_nnls_tolerance() -> f64 {
    1e-10
}

impl SolverConfig {
    /// Config for `method` with every other field at its default.
    pub fn new(method: SolverMethod) -> Self {
        SolverConfig {
            method,
            lambda: default_lambda(),
            order: default_order(),
            constraint: Constraint::None,
            iterations: default_iterations(),
            tolerance: None,
            relaxation: default_relaxation(),
            smoothing_passes: default_smoothing_passes(),
            gd: None,
            nnls_max_iterations: default_nnls_max_iterations(),
            nnls_tolerance: default_nnls_tolerance(),
        }
    }

    pub fn validate(&self) -> InversionResult<()> {
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(InversionError::ConfigError(
                "solver.lambda must be finite and >= 0".to_string(),
            ));
        }
        if self.order > 2 {
            return Err(InversionError::ConfigError(
                "solver.order must be 0, 1 or 2".to_string(),
            ));
        }
        if matches!(
            self.method,
            SolverMethod::Twomey | SolverMethod::TwomeyMarkowski | SolverMethod::Mart
        ) && self.iterations == 0
        {
            return Err(InversionError::ConfigError(
                "solver.iterations must be >= 1".to_string(),
            ));
        }
        if let Some(tol) = self.tolerance {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(InversionError::ConfigError(
                    "solver.tolerance must be finite and > 0".to_string(),
                ));
            }
        }
        if !self.relaxation.is_finite() || self.relaxation <= 0.0 {
            return Err(InversionError::ConfigError(
                "solver.relaxation must be finite and > 0".to_string(),
            ));
        }
        if self.method == SolverMethod::ExpDist && self.gd.is_none() {
            return Err(InversionError::ConfigError(
                "solver.gd is required for exp_dist".to_string(),
            ));
        }
        if self.nnls_max_iterations == 0 {
            return Err(InversionError::ConfigError(
                "solver.nnls_max_iterations must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl GridConfig {
    pub fn validate(&self) -> InversionResult<()> {
        for axis in 0..2 {
            let [lo, hi] = self.span[axis];
            if self.ne[axis] == 0 {
                return Err(InversionError::ConfigError(format!(
                    "grid.ne[{axis}] must be >= 1"
                )));
            }
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(InversionError::ConfigError(format!(
                    "grid.span[{axis}] must be finite with min < max"
                )));
            }
            if self.spacing[axis] == Spacing::Logarithmic && lo <= 0.0 {
                return Err(InversionError::ConfigError(format!(
                    "grid.span[{axis}] must be positive for a logarithmic axis"
                )));
            }
        }
        Ok(())
    }
}

impl InversionConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> InversionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InversionResult<()> {
        self.grid.validate()?;
        self.solver.validate()?;
        if self.kernel.size_axis > 1 {
            return Err(InversionError::ConfigError(
                "kernel.size_axis must be 0 or 1".to_string(),
            ));
        }
        if self.kernel.charge_states.is_empty() {
            return Err(InversionError::ConfigError(
                "kernel.charge_states must not be empty".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.kernel.sparsity_threshold) {
            return Err(InversionError::ConfigError(
                "kernel.sparsity_threshold must be in [0, 1)".to_string(),
            ));
        }
        Ok(())
    }
}
