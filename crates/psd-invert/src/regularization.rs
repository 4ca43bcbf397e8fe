// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Regularization Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Finite-difference penalty matrices built from grid adjacency.
//!
//! - order 0: `diag(w)`
//! - order 1: `U − diag(U·1)` with `U` the strictly upper part of the
//!   adjacency, so row `k` is `Σ_{l>k, l~k} (x_l − x_k)`
//! - order 2: `Adj − diag(Adj·1)`, the 5-point Laplacian
//!
//! Every operator is square over the grid's active elements. On a partial
//! grid the reduced adjacency is used, so cut edges behave as no-flux
//! boundaries.

use psd_grid::GridLike;
use psd_math::sparse::CsrMatrix;
use psd_types::error::{ensure_len, InversionError, InversionResult};

/// `diag(weights)`, or the identity when `weights` is `None`.
pub fn order0_operator(grid: &dyn GridLike, weights: Option<&[f64]>) -> InversionResult<CsrMatrix> {
    match weights {
        Some(w) => {
            ensure_len("order-0 weights", grid.len(), w.len())?;
            Ok(CsrMatrix::from_diagonal(w))
        }
        None => Ok(CsrMatrix::identity(grid.len())),
    }
}

/// First-difference operator toward the axis-1 and axis-2 successors.
pub fn order1_operator(grid: &dyn GridLike) -> CsrMatrix {
    let upper = grid.adjacency().upper_triangle();
    let deg = upper.row_sums();
    upper.add(&CsrMatrix::from_diagonal(&deg).scale(-1.0))
}

/// Graph Laplacian of the element adjacency.
pub fn order2_operator(grid: &dyn GridLike) -> CsrMatrix {
    let adj = grid.adjacency();
    let deg = adj.row_sums();
    adj.add(&CsrMatrix::from_diagonal(&deg).scale(-1.0))
}

/// Operator for Tikhonov `order` ∈ {0, 1, 2}; order 0 is the identity.
pub fn tikhonov_operator(grid: &dyn GridLike, order: u8) -> InversionResult<CsrMatrix> {
    match order {
        0 => order0_operator(grid, None),
        1 => Ok(order1_operator(grid)),
        2 => Ok(order2_operator(grid)),
        _ => Err(InversionError::ConfigError(format!(
            "Tikhonov order must be 0, 1 or 2, got {order}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use psd_grid::Grid;
    use psd_types::config::{CutAnchor, CutLine, Spacing};

    fn grid(n1: usize, n2: usize) -> Grid {
        Grid::new(
            [[1.0, 1000.0], [1.0, 1000.0]],
            [n1, n2],
            [Spacing::Logarithmic, Spacing::Logarithmic],
        )
        .unwrap()
    }

    #[test]
    fn test_order0_identity_and_weights() {
        let g = grid(3, 4);
        let l = order0_operator(&g, None).unwrap();
        assert_eq!(l, CsrMatrix::identity(12));
        let w: Vec<f64> = (0..12).map(|k| k as f64).collect();
        let lw = order0_operator(&g, Some(&w)).unwrap();
        assert_eq!(lw.get(5, 5), 5.0);
        assert!(order0_operator(&g, Some(&w[..3])).is_err());
    }

    #[test]
    fn test_difference_operators_annihilate_constants() {
        let g = grid(5, 4);
        let ones = Array1::from_elem(20, 1.0);
        for order in [1, 2] {
            let l = tikhonov_operator(&g, order).unwrap();
            assert_eq!(l.shape(), (20, 20));
            let r = l.matvec(ones.view());
            assert!(r.iter().all(|v| v.abs() < 1e-14), "order {order}");
        }
    }

    #[test]
    fn test_order1_row_structure() {
        let g = grid(3, 3);
        let l = order1_operator(&g);
        // (0,0) differences toward (1,0) and (0,1)
        let k = g.index(0, 0);
        assert_eq!(l.get(k, k), -2.0);
        assert_eq!(l.get(k, g.index(1, 0)), 1.0);
        assert_eq!(l.get(k, g.index(0, 1)), 1.0);
        // Last element has no successors
        let last = g.index(2, 2);
        assert!(l.row(last).all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_order2_interior_stencil() {
        let g = grid(3, 3);
        let l = order2_operator(&g);
        let c = g.index(1, 1);
        assert_eq!(l.get(c, c), -4.0);
        assert_eq!(l.get(c, g.index(0, 1)), 1.0);
        assert_eq!(l.get(c, g.index(0, 0)), 0.0);
        // Neumann corner
        assert_eq!(l.get(0, 0), -2.0);
        assert_eq!(l.transpose(), l);
    }

    #[test]
    fn test_order1_penalizes_gradients() {
        let g = grid(4, 4);
        let x = Array1::from_shape_fn(16, |k| g.coords(k).0 as f64);
        let r = order1_operator(&g).matvec(x.view());
        assert!(r.iter().any(|v| v.abs() > 0.5));
    }

    #[test]
    fn test_partial_grid_operator_respects_missing() {
        let g = grid(4, 4);
        let p = g
            .partial(
                CutLine {
                    anchor: CutAnchor::Intercept(0.0),
                    slope: 1.0,
                },
                None,
            )
            .unwrap();
        let l = order2_operator(&p);
        assert_eq!(l.shape(), (10, 10));
        // (0,0) keeps only its (0,1) neighbour on the partial grid
        let k = p.global_index(0, 0).unwrap();
        assert_eq!(l.get(k, k), -1.0);
        let ones = Array1::from_elem(10, 1.0);
        assert!(l.matvec(ones.view()).iter().all(|v| v.abs() < 1e-14));
    }

    #[test]
    fn test_invalid_order() {
        let g = grid(2, 2);
        assert!(matches!(
            tikhonov_operator(&g, 3),
            Err(InversionError::ConfigError(_))
        ));
    }
}
