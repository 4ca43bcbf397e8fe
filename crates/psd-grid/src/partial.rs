// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Partial Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Grid with a triangular region removed by one or two cut lines.
//!
//! A cut is the line `t₁ = b + s·t₂` in the transformed space. Elements
//! lying entirely on or above the upper cut, or entirely on or below the
//! lower cut, are removed. Elements the line passes through are kept with
//! their area reduced to the retained side.

use ndarray::Array1;
use psd_types::config::{CutAnchor, CutLine, Spacing};
use psd_types::constants::CUT_EPSILON;
use psd_types::error::{InversionError, InversionResult};

use crate::grid::Grid;
use crate::GridLike;

/// Monotone compaction of the full index space.
///
/// Built once from the removal mask; `retained` lists kept full-mesh
/// indices in ascending order, so compact index `p` maps to `retained[p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Compaction {
    to_compact: Vec<Option<usize>>,
    retained: Vec<usize>,
    missing: Vec<usize>,
}

impl Compaction {
    pub fn from_mask(removed: &[bool]) -> Self {
        let mut to_compact = Vec::with_capacity(removed.len());
        let mut retained = Vec::new();
        let mut missing = Vec::new();
        for (k, &gone) in removed.iter().enumerate() {
            if gone {
                to_compact.push(None);
                missing.push(k);
            } else {
                to_compact.push(Some(retained.len()));
                retained.push(k);
            }
        }
        Compaction {
            to_compact,
            retained,
            missing,
        }
    }

    /// Compact index of full-mesh element `k`, `None` if removed.
    #[inline]
    pub fn to_compact(&self, k: usize) -> Option<usize> {
        self.to_compact.get(k).copied().flatten()
    }

    pub fn retained(&self) -> &[usize] {
        &self.retained
    }

    pub fn missing(&self) -> &[usize] {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}

/// Resolved cut line in the transformed space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    pub intercept: f64,
    pub slope: f64,
}

impl Cut {
    pub fn resolve(line: &CutLine, spacing: [Spacing; 2]) -> InversionResult<Self> {
        if !line.slope.is_finite() {
            return Err(InversionError::InvalidGridSpec(
                "cut slope must be finite".to_string(),
            ));
        }
        let intercept = match line.anchor {
            CutAnchor::Intercept(b) => b,
            CutAnchor::Point([p1, p2]) => {
                for (axis, p) in [(0, p1), (1, p2)] {
                    if spacing[axis] == Spacing::Logarithmic && p <= 0.0 {
                        return Err(InversionError::InvalidGridSpec(format!(
                            "cut point coordinate {p} on logarithmic axis {axis} must be positive"
                        )));
                    }
                }
                spacing[0].forward(p1) - line.slope * spacing[1].forward(p2)
            }
        };
        if !intercept.is_finite() {
            return Err(InversionError::InvalidGridSpec(
                "cut intercept must be finite".to_string(),
            ));
        }
        Ok(Cut {
            intercept,
            slope: line.slope,
        })
    }

    /// Signed offset of `(t1, t2)` from the line, positive above.
    #[inline]
    pub fn offset(&self, t1: f64, t2: f64) -> f64 {
        t1 - self.slope * t2 - self.intercept
    }

    fn corner_offsets(&self, b: [f64; 4]) -> [f64; 4] {
        [
            self.offset(b[0], b[2]),
            self.offset(b[1], b[2]),
            self.offset(b[0], b[3]),
            self.offset(b[1], b[3]),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct PartialGrid {
    grid: Grid,
    upper: Cut,
    lower: Option<Cut>,
    compaction: Compaction,
    area: Array1<f64>,
}

impl PartialGrid {
    pub fn new(grid: Grid, upper: CutLine, lower: Option<CutLine>) -> InversionResult<Self> {
        let spacing = grid.spacing();
        let upper = Cut::resolve(&upper, spacing)?;
        let lower = lower.map(|l| Cut::resolve(&l, spacing)).transpose()?;

        let n = grid.full_len();
        let mut removed = vec![false; n];
        let mut full_area = grid.full_element_area();

        for (k, gone) in removed.iter_mut().enumerate() {
            let bounds = grid.transformed_bounds(k);

            let up = upper.corner_offsets(bounds);
            let above = up.iter().copied().fold(f64::INFINITY, f64::min) >= -CUT_EPSILON;
            let below = lower.is_some_and(|c| {
                let lo = c.corner_offsets(bounds);
                lo.iter().copied().fold(f64::NEG_INFINITY, f64::max) <= CUT_EPSILON
            });

            if above || below {
                *gone = true;
                continue;
            }

            let mut fraction = retained_fraction(bounds, |t1, t2| upper.offset(t1, t2));
            if let Some(c) = lower {
                fraction *= retained_fraction(bounds, |t1, t2| -c.offset(t1, t2));
            }
            full_area[k] *= fraction;
        }

        let compaction = Compaction::from_mask(&removed);
        if compaction.is_empty() {
            return Err(InversionError::InvalidGridSpec(
                "cut removes every element".to_string(),
            ));
        }
        let area = compaction.retained().iter().map(|&k| full_area[k]).collect();

        tracing::debug!(
            full = n,
            retained = compaction.len(),
            missing = compaction.missing().len(),
            "partial grid built"
        );

        Ok(PartialGrid {
            grid,
            upper,
            lower,
            compaction,
            area,
        })
    }

    /// Upper and optional lower cut in the transformed space.
    pub fn cuts(&self) -> (Cut, Option<Cut>) {
        (self.upper, self.lower)
    }

    /// Drop removed elements from a full-mesh vector.
    pub fn full2partial(&self, x: &Array1<f64>) -> InversionResult<Array1<f64>> {
        self.from_full(x)
    }

    /// Zero-fill removed elements.
    pub fn partial2full(&self, x: &Array1<f64>) -> InversionResult<Array1<f64>> {
        self.to_full(x)
    }
}

impl GridLike for PartialGrid {
    fn full(&self) -> &Grid {
        &self.grid
    }

    fn compaction(&self) -> Option<&Compaction> {
        Some(&self.compaction)
    }

    fn element_area(&self) -> Array1<f64> {
        self.area.clone()
    }
}

/// Fraction of the rectangle `[t1_lo, t1_hi] × [t2_lo, t2_hi]` where `f ≤ 0`.
fn retained_fraction(b: [f64; 4], f: impl Fn(f64, f64) -> f64) -> f64 {
    let rect = vec![[b[0], b[2]], [b[1], b[2]], [b[1], b[3]], [b[0], b[3]]];
    let full = polygon_area(&rect);
    if full <= 0.0 {
        return 1.0;
    }
    let clipped = clip_half_plane(&rect, &f);
    (polygon_area(&clipped) / full).clamp(0.0, 1.0)
}

/// Sutherland–Hodgman clip of a convex polygon to `f ≤ 0`.
fn clip_half_plane(poly: &[[f64; 2]], f: &impl Fn(f64, f64) -> f64) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    for (idx, &p) in poly.iter().enumerate() {
        let q = poly[(idx + 1) % poly.len()];
        let fp = f(p[0], p[1]);
        let fq = f(q[0], q[1]);
        if fp <= 0.0 {
            out.push(p);
        }
        if (fp < 0.0 && fq > 0.0) || (fp > 0.0 && fq < 0.0) {
            let s = fp / (fp - fq);
            out.push([p[0] + s * (q[0] - p[0]), p[1] + s * (q[1] - p[1])]);
        }
    }
    out
}

/// Shoelace area.
fn polygon_area(poly: &[[f64; 2]]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for (idx, p) in poly.iter().enumerate() {
        let q = poly[(idx + 1) % poly.len()];
        acc += p[0] * q[1] - q[0] * p[1];
    }
    0.5 * acc.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize) -> Grid {
        Grid::new(
            [[1.0, 1000.0], [1.0, 1000.0]],
            [n, n],
            [Spacing::Logarithmic, Spacing::Logarithmic],
        )
        .unwrap()
    }

    fn diagonal_cut() -> CutLine {
        CutLine {
            anchor: CutAnchor::Intercept(0.0),
            slope: 1.0,
        }
    }

    #[test]
    fn test_upper_cut_removes_centers_above_diagonal() {
        let n = 9;
        let g = square(n);
        let p = g.partial(diagonal_cut(), None).unwrap();
        let expected: Vec<usize> = (0..n * n)
            .filter(|&k| {
                let (i, j) = g.coords(k);
                i > j
            })
            .collect();
        assert_eq!(p.missing(), expected.as_slice());
        assert_eq!(p.missing().len(), n * (n - 1) / 2);
        assert_eq!(p.len(), n * (n + 1) / 2);
    }

    #[test]
    fn test_diagonal_elements_half_area() {
        let n = 6;
        let g = square(n);
        let w = g.widths(0)[0] * g.widths(1)[0];
        let p = g.partial(diagonal_cut(), None).unwrap();
        let area = p.element_area();
        for d in 0..n {
            let k = p.global_index(d, d).unwrap();
            assert!((area[k] - 0.5 * w).abs() < 1e-12, "diag {d}: {}", area[k]);
        }
        let k = p.global_index(0, 3).unwrap();
        assert!((area[k] - w).abs() < 1e-12);
        // Total retained area is half the square
        let total: f64 = area.sum();
        assert!((total - 0.5 * 9.0).abs() < 1e-9, "total = {total}");
    }

    #[test]
    fn test_global_index_of_removed_is_none() {
        let g = square(5);
        let p = g.partial(diagonal_cut(), None).unwrap();
        assert_eq!(p.global_index(3, 1), None);
        assert_eq!(p.global_index(0, 0), Some(0));
        // Row j = 1 keeps i = 0, 1 after the single element of row 0
        assert_eq!(p.global_index(0, 1), Some(1));
        assert_eq!(p.global_index(1, 1), Some(2));
    }

    #[test]
    fn test_partial_full_roundtrip() {
        let g = square(7);
        let p = g.partial(diagonal_cut(), None).unwrap();
        let x = Array1::from_shape_fn(p.len(), |i| i as f64 + 1.0);
        let full = p.partial2full(&x).unwrap();
        assert_eq!(full.len(), 49);
        for &k in p.missing() {
            assert_eq!(full[k], 0.0);
        }
        assert_eq!(p.full2partial(&full).unwrap(), x);
    }

    #[test]
    fn test_two_cuts_band() {
        let g = square(8);
        let lower = CutLine {
            anchor: CutAnchor::Intercept(-1.0),
            slope: 1.0,
        };
        let p = g.partial(diagonal_cut(), Some(lower)).unwrap();
        // Width 3/8 decade: band t2 - 1 ≤ t1 ≤ t2
        for k in 0..g.full_len() {
            let b = g.transformed_bounds(k);
            let max_lower = b[1] - b[2] + 1.0;
            if max_lower <= CUT_EPSILON {
                assert!(p.missing().contains(&k), "{k} should be below lower cut");
            }
        }
        let area = p.element_area();
        assert!(area.iter().all(|&a| a > 0.0));
        assert!(area.sum() < 0.5 * 9.0);
    }

    #[test]
    fn test_point_anchor_matches_intercept() {
        let g = square(6);
        let by_point = g
            .partial(
                CutLine {
                    anchor: CutAnchor::Point([10.0, 10.0]),
                    slope: 1.0,
                },
                None,
            )
            .unwrap();
        let by_intercept = g.partial(diagonal_cut(), None).unwrap();
        assert_eq!(by_point.missing(), by_intercept.missing());
    }

    #[test]
    fn test_cut_removing_everything_fails() {
        let g = square(4);
        let line = CutLine {
            anchor: CutAnchor::Intercept(-10.0),
            slope: 1.0,
        };
        assert!(matches!(
            g.partial(line, None),
            Err(InversionError::InvalidGridSpec(_))
        ));
    }

    #[test]
    fn test_partial_adjacency_restricted() {
        let g = square(4);
        let p = g.partial(diagonal_cut(), None).unwrap();
        let adj = p.adjacency();
        assert_eq!(adj.shape(), (p.len(), p.len()));
        // (0,0) neighbours: (1,0) removed, (0,1) kept
        let k00 = p.global_index(0, 0).unwrap();
        let k01 = p.global_index(0, 1).unwrap();
        assert_eq!(adj.get(k00, k01), 1.0);
        assert_eq!(adj.row(k00).count(), 1);
    }

    #[test]
    fn test_clip_fraction_triangle() {
        // Unit square clipped by t1 ≤ t2 keeps half
        let f = retained_fraction([0.0, 1.0, 0.0, 1.0], |t1, t2| t1 - t2);
        assert!((f - 0.5).abs() < 1e-12);
        // Line through a corner region: t1 ≤ t2 - 0.5 keeps 1/8
        let f = retained_fraction([0.0, 1.0, 0.0, 1.0], |t1, t2| t1 - t2 + 0.5);
        assert!((f - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_partial_marginalize_ignores_missing() {
        let g = square(4);
        let p = g.partial(diagonal_cut(), None).unwrap();
        let x = Array1::from_elem(p.len(), 1.0);
        let m = p.marginalize(&x, 1).unwrap();
        // Column j keeps i = 0..=j, each of width 0.75
        for j in 0..4 {
            assert!((m[j] - 0.75 * (j + 1) as f64).abs() < 1e-12);
        }
    }
}
