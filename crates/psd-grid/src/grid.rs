// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Rectangular discretization of a 2-D size-parameter space.
//!
//! Element `k = i + j·ne₁` has axis-1 index `i` (varying fastest) and
//! axis-2 index `j`. Every distribution vector defined on a grid follows
//! this ordering. Geometry is computed in the transformed space (log10
//! for logarithmic axes), where every axis is uniform for span-built grids.

use ndarray::{Array1, Array2};
use psd_math::sparse::CsrMatrix;
use psd_types::config::{CutLine, Spacing};
use psd_types::error::{ensure_len, InversionError, InversionResult};

use crate::partial::PartialGrid;

#[derive(Debug, Clone)]
pub struct Grid {
    span: [[f64; 2]; 2],
    ne: [usize; 2],
    spacing: [Spacing; 2],
    /// Node coordinates, `ne[a] + 1` per axis, physical units.
    edges: [Vec<f64>; 2],
    /// Node coordinates in the transformed space.
    tedges: [Vec<f64>; 2],
    /// Element centres in the transformed space.
    tcenters: [Vec<f64>; 2],
    /// Element centres in physical units (geometric midpoints on log axes).
    centers: [Vec<f64>; 2],
    elements: Array2<f64>,
    nelements: Array2<f64>,
    adj: CsrMatrix,
}

impl Grid {
    /// Uniform grid (in the transformed space) over `span` with `ne` elements per axis.
    pub fn new(span: [[f64; 2]; 2], ne: [usize; 2], spacing: [Spacing; 2]) -> InversionResult<Self> {
        for axis in 0..2 {
            let [lo, hi] = span[axis];
            if ne[axis] == 0 {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: element count must be positive"
                )));
            }
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: span [{lo}, {hi}] must be finite and increasing"
                )));
            }
            if spacing[axis] == Spacing::Logarithmic && lo <= 0.0 {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: logarithmic span must be positive, got {lo}"
                )));
            }
        }

        let tedges = [0, 1].map(|axis| {
            let s = spacing[axis];
            let (t0, t1) = (s.forward(span[axis][0]), s.forward(span[axis][1]));
            let n = ne[axis];
            (0..=n)
                .map(|i| t0 + (t1 - t0) * i as f64 / n as f64)
                .collect::<Vec<f64>>()
        });
        let edges = [0, 1].map(|axis| {
            let n = ne[axis];
            let mut e: Vec<f64> = tedges[axis].iter().map(|&t| spacing[axis].inverse(t)).collect();
            // Pin end nodes to the span so log roundoff does not move them
            e[0] = span[axis][0];
            e[n] = span[axis][1];
            e
        });

        Ok(Self::assemble(span, ne, spacing, edges, tedges))
    }

    /// Grid from explicit node vectors (one per axis, at least two nodes each).
    pub fn from_edges(edges: [Vec<f64>; 2], spacing: [Spacing; 2]) -> InversionResult<Self> {
        for axis in 0..2 {
            let e = &edges[axis];
            if e.len() < 2 {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: need at least two edges, got {}",
                    e.len()
                )));
            }
            if e.iter().any(|v| !v.is_finite()) {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: edges must be finite"
                )));
            }
            if e.windows(2).any(|w| w[1] <= w[0]) {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: edges must be strictly increasing"
                )));
            }
            if spacing[axis] == Spacing::Logarithmic && e[0] <= 0.0 {
                return Err(InversionError::InvalidGridSpec(format!(
                    "axis {axis}: logarithmic edges must be positive"
                )));
            }
        }

        let span = [0, 1].map(|axis| [edges[axis][0], edges[axis][edges[axis].len() - 1]]);
        let ne = [edges[0].len() - 1, edges[1].len() - 1];
        let tedges = [0, 1].map(|axis| {
            edges[axis]
                .iter()
                .map(|&v| spacing[axis].forward(v))
                .collect::<Vec<f64>>()
        });
        Ok(Self::assemble(span, ne, spacing, edges, tedges))
    }

    fn assemble(
        span: [[f64; 2]; 2],
        ne: [usize; 2],
        spacing: [Spacing; 2],
        edges: [Vec<f64>; 2],
        tedges: [Vec<f64>; 2],
    ) -> Self {
        let tcenters = [0, 1].map(|axis| {
            tedges[axis]
                .windows(2)
                .map(|w| 0.5 * (w[0] + w[1]))
                .collect::<Vec<f64>>()
        });
        let centers = [0, 1].map(|axis| {
            tcenters[axis]
                .iter()
                .map(|&t| spacing[axis].inverse(t))
                .collect::<Vec<f64>>()
        });

        let n_el = ne[0] * ne[1];
        let mut elements = Array2::zeros((n_el, 2));
        let mut nelements = Array2::zeros((n_el, 4));
        for j in 0..ne[1] {
            for i in 0..ne[0] {
                let k = i + j * ne[0];
                elements[[k, 0]] = centers[0][i];
                elements[[k, 1]] = centers[1][j];
                nelements[[k, 0]] = edges[0][i];
                nelements[[k, 1]] = edges[0][i + 1];
                nelements[[k, 2]] = edges[1][j];
                nelements[[k, 3]] = edges[1][j + 1];
            }
        }

        let adj = build_adjacency(ne);

        Grid {
            span,
            ne,
            spacing,
            edges,
            tedges,
            tcenters,
            centers,
            elements,
            nelements,
            adj,
        }
    }

    pub fn span(&self) -> [[f64; 2]; 2] {
        self.span
    }

    pub fn ne(&self) -> [usize; 2] {
        self.ne
    }

    pub fn spacing(&self) -> [Spacing; 2] {
        self.spacing
    }

    /// (ne₁, ne₂), the shape returned by `reshape`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ne[0], self.ne[1])
    }

    /// Number of elements in the full mesh.
    pub fn full_len(&self) -> usize {
        self.ne[0] * self.ne[1]
    }

    /// Node coordinates along `axis`, physical units.
    pub fn edges(&self, axis: usize) -> &[f64] {
        &self.edges[axis]
    }

    /// Node coordinates along `axis` in the transformed space.
    pub fn transformed_edges(&self, axis: usize) -> &[f64] {
        &self.tedges[axis]
    }

    /// Element centres along `axis`, physical units.
    pub fn centers(&self, axis: usize) -> &[f64] {
        &self.centers[axis]
    }

    /// Element centres along `axis` in the transformed space.
    pub fn transformed_centers(&self, axis: usize) -> &[f64] {
        &self.tcenters[axis]
    }

    /// Element widths along `axis` in the transformed space.
    pub fn widths(&self, axis: usize) -> Vec<f64> {
        self.tedges[axis].windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Full-mesh linear index, unchecked.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i + j * self.ne[0]
    }

    /// Inverse of [`Grid::index`].
    #[inline]
    pub fn coords(&self, k: usize) -> (usize, usize) {
        (k % self.ne[0], k / self.ne[0])
    }

    /// Element centres, `Ne × 2`.
    pub fn element_centers(&self) -> &Array2<f64> {
        &self.elements
    }

    /// Element edges, `Ne × 4`: axis-1 lower/upper, axis-2 lower/upper.
    pub fn element_edges(&self) -> &Array2<f64> {
        &self.nelements
    }

    /// 4-point-stencil adjacency of the full mesh.
    pub fn full_adjacency(&self) -> &CsrMatrix {
        &self.adj
    }

    /// Element areas in the transformed space (Δlog·Δlog on log axes).
    pub fn full_element_area(&self) -> Array1<f64> {
        let w1 = self.widths(0);
        let w2 = self.widths(1);
        Array1::from_shape_fn(self.full_len(), |k| {
            let (i, j) = self.coords(k);
            w1[i] * w2[j]
        })
    }

    /// Transformed-space corners of element `k`: `[t1_lo, t1_hi, t2_lo, t2_hi]`.
    pub fn transformed_bounds(&self, k: usize) -> [f64; 4] {
        let (i, j) = self.coords(k);
        [
            self.tedges[0][i],
            self.tedges[0][i + 1],
            self.tedges[1][j],
            self.tedges[1][j + 1],
        ]
    }

    /// Inverse of the axis-1-fastest linearization, over the full mesh.
    pub(crate) fn unflatten(&self, x: &Array1<f64>) -> InversionResult<Array2<f64>> {
        ensure_len("grid reshape", self.full_len(), x.len())?;
        let ne1 = self.ne[0];
        Ok(Array2::from_shape_fn(self.shape(), |(i, j)| x[i + j * ne1]))
    }

    /// Forward linearization of an `ne₁ × ne₂` array.
    pub(crate) fn flatten(&self, x: &Array2<f64>) -> InversionResult<Array1<f64>> {
        if x.dim() != self.shape() {
            return Err(InversionError::DimensionMismatch {
                context: format!("grid vectorize (expected shape {:?}, found {:?})", self.shape(), x.dim()),
                expected: self.full_len(),
                found: x.len(),
            });
        }
        Ok(Array1::from_shape_fn(self.full_len(), |k| {
            let (i, j) = self.coords(k);
            x[[i, j]]
        }))
    }

    /// Marginal along `axis` of a full-mesh vector, weighting by the
    /// transformed width of the summed axis.
    pub(crate) fn marginal(&self, x: &Array1<f64>, axis: usize) -> InversionResult<Array1<f64>> {
        let xx = self.unflatten(x)?;
        match axis {
            0 => {
                let w2 = Array1::from_vec(self.widths(1));
                Ok(xx.dot(&w2))
            }
            1 => {
                let w1 = Array1::from_vec(self.widths(0));
                Ok(xx.t().dot(&w1))
            }
            _ => Err(InversionError::InvalidGridSpec(format!(
                "marginalize: axis {axis} out of range"
            ))),
        }
    }

    /// Reduced grid with elements beyond one or two cut lines removed.
    pub fn partial(&self, upper: CutLine, lower: Option<CutLine>) -> InversionResult<PartialGrid> {
        PartialGrid::new(self.clone(), upper, lower)
    }
}

/// Face-sharing neighbours along either axis, symmetric, unit weights.
fn build_adjacency(ne: [usize; 2]) -> CsrMatrix {
    let n = ne[0] * ne[1];
    let mut triplets = Vec::with_capacity(4 * n);
    for j in 0..ne[1] {
        for i in 0..ne[0] {
            let k = i + j * ne[0];
            if i + 1 < ne[0] {
                triplets.push((k, k + 1, 1.0));
                triplets.push((k + 1, k, 1.0));
            }
            if j + 1 < ne[1] {
                triplets.push((k, k + ne[0], 1.0));
                triplets.push((k + ne[0], k, 1.0));
            }
        }
    }
    CsrMatrix::from_triplets(n, n, &triplets)
}
