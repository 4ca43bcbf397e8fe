// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discretization engine: full and partial 2-D grids.
//!
//! [`GridLike`] is the capability every consumer (kernel assembly,
//! regularization, solvers) programs against. A full [`Grid`] and an
//! index-compacted [`PartialGrid`] both implement it; [`Discretization`]
//! is the tagged variant used when the choice is made at runtime.

pub mod discretization;
pub mod grid;
pub mod partial;

pub use discretization::Discretization;
pub use grid::Grid;
pub use partial::{Compaction, Cut, PartialGrid};

use ndarray::{Array1, Array2};
use psd_math::interp::bilinear_weights;
use psd_math::sparse::CsrMatrix;
use psd_types::error::{ensure_len, InversionResult};

/// Operations shared by full and partial grids.
///
/// Implementors supply the full-mesh ancestor, the optional index
/// compaction and element areas; everything else is computed on the full
/// mesh and projected through the compaction.
pub trait GridLike {
    /// Full-mesh ancestor.
    fn full(&self) -> &Grid;

    /// Index compaction, `None` for a full grid.
    fn compaction(&self) -> Option<&Compaction>;

    /// Per-element integration weight in the transformed space.
    fn element_area(&self) -> Array1<f64>;

    /// Number of active elements.
    fn len(&self) -> usize {
        match self.compaction() {
            Some(c) => c.len(),
            None => self.full().full_len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted full-mesh indices removed from this grid.
    fn missing(&self) -> &[usize] {
        match self.compaction() {
            Some(c) => c.missing(),
            None => &[],
        }
    }

    /// Active index of mesh cell `(i, j)`, `None` if outside the mesh or removed.
    fn global_index(&self, i: usize, j: usize) -> Option<usize> {
        let [ne1, ne2] = self.full().ne();
        if i >= ne1 || j >= ne2 {
            return None;
        }
        let k = self.full().index(i, j);
        match self.compaction() {
            Some(c) => c.to_compact(k),
            None => Some(k),
        }
    }

    /// Element centres, `len() × 2`.
    fn elements(&self) -> Array2<f64> {
        restrict_rows(self.full().element_centers(), self.compaction())
    }

    /// Element edges, `len() × 4`.
    fn nelements(&self) -> Array2<f64> {
        restrict_rows(self.full().element_edges(), self.compaction())
    }

    /// Face-sharing adjacency among active elements.
    fn adjacency(&self) -> CsrMatrix {
        let adj = self.full().full_adjacency();
        match self.compaction() {
            Some(c) => adj.select_rows(c.retained()).select_columns(c.retained()),
            None => adj.clone(),
        }
    }

    /// Zero-fill an active-index vector to the full mesh.
    fn to_full(&self, x: &Array1<f64>) -> InversionResult<Array1<f64>> {
        ensure_len("to_full", self.len(), x.len())?;
        match self.compaction() {
            Some(c) => {
                let mut out = Array1::zeros(self.full().full_len());
                for (p, &k) in c.retained().iter().enumerate() {
                    out[k] = x[p];
                }
                Ok(out)
            }
            None => Ok(x.clone()),
        }
    }

    /// Drop removed elements from a full-mesh vector.
    fn from_full(&self, x: &Array1<f64>) -> InversionResult<Array1<f64>> {
        ensure_len("from_full", self.full().full_len(), x.len())?;
        match self.compaction() {
            Some(c) => Ok(c.retained().iter().map(|&k| x[k]).collect()),
            None => Ok(x.clone()),
        }
    }

    /// `ne₁ × ne₂` array; removed elements are zero.
    fn reshape(&self, x: &Array1<f64>) -> InversionResult<Array2<f64>> {
        self.full().unflatten(&self.to_full(x)?)
    }

    fn vectorize(&self, x: &Array2<f64>) -> InversionResult<Array1<f64>> {
        self.from_full(&self.full().flatten(x)?)
    }

    /// Marginal density along `axis` (0 or 1), summing over the other axis
    /// weighted by its element widths.
    fn marginalize(&self, x: &Array1<f64>, axis: usize) -> InversionResult<Array1<f64>> {
        self.full().marginal(&self.to_full(x)?, axis)
    }

    /// Sparse `len() × from.len()` bilinear map from `from`'s basis to this one.
    ///
    /// Interpolation runs in `from`'s transformed space over its element
    /// centres; targets outside that hull get an empty row. Removed elements
    /// are stripped from both sides.
    fn transform(&self, from: &dyn GridLike) -> CsrMatrix {
        let src = from.full();
        let dst = self.full();
        let sp = src.spacing();
        let (ax1, ax2) = (src.transformed_centers(0), src.transformed_centers(1));
        let centers = dst.element_centers();

        let mut triplets = Vec::with_capacity(4 * dst.full_len());
        for k in 0..dst.full_len() {
            let q1 = sp[0].forward(centers[[k, 0]]);
            let q2 = sp[1].forward(centers[[k, 1]]);
            if let Some(stencil) = bilinear_weights(ax1, ax2, q1, q2) {
                for (i, j, w) in stencil {
                    if w != 0.0 {
                        triplets.push((k, src.index(i, j), w));
                    }
                }
            }
        }
        let mut t = CsrMatrix::from_triplets(dst.full_len(), src.full_len(), &triplets);
        if let Some(c) = self.compaction() {
            t = t.select_rows(c.retained());
        }
        if let Some(c) = from.compaction() {
            t = t.select_columns(c.retained());
        }
        t
    }

    /// Interpolate a distribution on `from` onto this grid; out-of-range values become 0.
    fn project(&self, from: &dyn GridLike, x: &Array1<f64>) -> InversionResult<Array1<f64>> {
        ensure_len("project", from.len(), x.len())?;
        Ok(self.transform(from).matvec(x.view()))
    }
}

fn restrict_rows(a: &Array2<f64>, compaction: Option<&Compaction>) -> Array2<f64> {
    match compaction {
        Some(c) => a.select(ndarray::Axis(0), c.retained()),
        None => a.clone(),
    }
}

impl GridLike for Grid {
    fn full(&self) -> &Grid {
        self
    }

    fn compaction(&self) -> Option<&Compaction> {
        None
    }

    fn element_area(&self) -> Array1<f64> {
        self.full_element_area()
    }
}
