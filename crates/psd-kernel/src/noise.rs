// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Measurement Noise
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Counting-statistics noise for synthetic data vectors.
//!
//! σᵢ = sqrt(poisson_scale · |bᵢ| + gaussian_floor²)

use ndarray::Array1;
use psd_types::error::{InversionError, InversionResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    /// Variance per unit signal (shot-noise term).
    pub poisson_scale: f64,
    /// Signal-independent standard deviation.
    pub gaussian_floor: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel {
            poisson_scale: 0.0,
            gaussian_floor: 0.0,
        }
    }
}

impl NoiseModel {
    pub fn new(poisson_scale: f64, gaussian_floor: f64) -> InversionResult<Self> {
        if !poisson_scale.is_finite() || poisson_scale < 0.0 {
            return Err(InversionError::ConfigError(
                "noise poisson_scale must be finite and >= 0".to_string(),
            ));
        }
        if !gaussian_floor.is_finite() || gaussian_floor < 0.0 {
            return Err(InversionError::ConfigError(
                "noise gaussian_floor must be finite and >= 0".to_string(),
            ));
        }
        Ok(NoiseModel {
            poisson_scale,
            gaussian_floor,
        })
    }

    /// Per-point standard deviation.
    pub fn sigma(&self, b: &Array1<f64>) -> Array1<f64> {
        b.mapv(|v| (self.poisson_scale * v.abs() + self.gaussian_floor * self.gaussian_floor).sqrt())
    }

    /// Noisy copy of `b` and the σ used for each point.
    pub fn add_noise<R: Rng + ?Sized>(
        &self,
        b: &Array1<f64>,
        rng: &mut R,
    ) -> InversionResult<(Array1<f64>, Array1<f64>)> {
        let sigma = self.sigma(b);
        let mut noisy = b.clone();
        for (v, &s) in noisy.iter_mut().zip(sigma.iter()) {
            let dist = Normal::new(0.0, s)
                .map_err(|e| InversionError::ConfigError(format!("noise sigma {s}: {e}")))?;
            *v += dist.sample(&mut *rng);
        }
        Ok((noisy, sigma))
    }

    /// Reproducible variant of [`NoiseModel::add_noise`].
    pub fn add_noise_seeded(
        &self,
        b: &Array1<f64>,
        seed: u64,
    ) -> InversionResult<(Array1<f64>, Array1<f64>)> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.add_noise(b, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_model_is_identity() {
        let b = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let (noisy, sigma) = NoiseModel::default().add_noise_seeded(&b, 7).unwrap();
        assert_eq!(noisy, b);
        assert!(sigma.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_seeded_noise_reproducible() {
        let m = NoiseModel::new(0.1, 0.01).unwrap();
        let b = Array1::from_elem(50, 10.0);
        let (n1, _) = m.add_noise_seeded(&b, 42).unwrap();
        let (n2, _) = m.add_noise_seeded(&b, 42).unwrap();
        assert_eq!(n1, n2);
        assert_ne!(n1, b);
    }

    #[test]
    fn test_sigma_formula() {
        let m = NoiseModel::new(4.0, 3.0).unwrap();
        let s = m.sigma(&Array1::from_vec(vec![4.0, 0.0]));
        assert!((s[0] - 5.0).abs() < 1e-12);
        assert!((s[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_noise_scale_statistics() {
        let m = NoiseModel::new(0.0, 0.5).unwrap();
        let b = Array1::zeros(4000);
        let (noisy, _) = m.add_noise_seeded(&b, 3).unwrap();
        let var = noisy.mapv(|v| v * v).mean().unwrap();
        assert!((var.sqrt() - 0.5).abs() < 0.05, "std = {}", var.sqrt());
    }

    #[test]
    fn test_negative_parameters_rejected() {
        assert!(NoiseModel::new(-1.0, 0.0).is_err());
        assert!(NoiseModel::new(0.0, f64::NAN).is_err());
    }
}
