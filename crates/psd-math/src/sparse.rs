// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Sparse
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Compressed sparse row matrix.
//!
//! Holds kernels (n_b × n_e), regularization operators (n_e × n_e),
//! adjacency graphs and grid-to-grid transforms. Column indices inside a
//! row are always sorted and unique, so structural comparisons and
//! row merges are linear.

use ndarray::{Array1, Array2, ArrayView1};

#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// Empty (all-zero) matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        CsrMatrix {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&vec![1.0; n])
    }

    /// Square diagonal matrix. Zero entries are stored structurally so the
    /// sparsity pattern is independent of the values.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        CsrMatrix {
            nrows: n,
            ncols: n,
            indptr: (0..=n).collect(),
            indices: (0..n).collect(),
            data: diag.to_vec(),
        }
    }

    /// Build from (row, col, value) triplets. Duplicates are summed.
    ///
    /// Panics if an index is out of bounds.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nrows];
        for &(i, j, v) in triplets {
            assert!(i < nrows && j < ncols, "triplet ({i}, {j}) outside {nrows}x{ncols}");
            rows[i].push((j, v));
        }
        Self::from_rows(ncols, rows)
    }

    fn from_rows(ncols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let nrows = rows.len();
        let mut indptr = Vec::with_capacity(nrows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(j, _)| j);
            let mut last: Option<usize> = None;
            for (j, v) in row {
                if last == Some(j) {
                    if let Some(d) = data.last_mut() {
                        *d += v;
                    }
                } else {
                    indices.push(j);
                    data.push(v);
                    last = Some(j);
                }
            }
            indptr.push(indices.len());
        }
        CsrMatrix {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    /// Keep entries with `|v| > drop_below`.
    pub fn from_dense(a: &Array2<f64>, drop_below: f64) -> Self {
        let (m, n) = a.dim();
        let rows = (0..m)
            .map(|i| {
                (0..n)
                    .filter_map(|j| {
                        let v = a[[i, j]];
                        (v.abs() > drop_below).then_some((j, v))
                    })
                    .collect()
            })
            .collect();
        Self::from_rows(n, rows)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.nrows, self.ncols));
        for (i, j, v) in self.iter() {
            out[[i, j]] = v;
        }
        out
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Value at (i, j), zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (cols, vals) = self.row_slices(i);
        match cols.binary_search(&j) {
            Ok(p) => vals[p],
            Err(_) => 0.0,
        }
    }

    fn row_slices(&self, i: usize) -> (&[usize], &[f64]) {
        let (s, e) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[s..e], &self.data[s..e])
    }

    /// Stored `(col, value)` pairs of row `i`, in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (cols, vals) = self.row_slices(i);
        cols.iter().copied().zip(vals.iter().copied())
    }

    /// All stored `(row, col, value)` triplets in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    /// y = A x
    pub fn matvec(&self, x: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(x.len(), self.ncols, "matvec: x has {} entries, A has {} columns", x.len(), self.ncols);
        Array1::from_shape_fn(self.nrows, |i| self.row(i).map(|(j, v)| v * x[j]).sum())
    }

    /// y = Aᵀ x
    pub fn transpose_matvec(&self, x: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(x.len(), self.nrows, "transpose_matvec: x has {} entries, A has {} rows", x.len(), self.nrows);
        let mut y = Array1::zeros(self.ncols);
        for (i, j, v) in self.iter() {
            y[j] += v * x[i];
        }
        y
    }

    pub fn transpose(&self) -> CsrMatrix {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); self.ncols];
        for (i, j, v) in self.iter() {
            rows[j].push((i, v));
        }
        Self::from_rows(self.nrows, rows)
    }

    /// Sparse product A · B.
    pub fn matmul(&self, other: &CsrMatrix) -> CsrMatrix {
        assert_eq!(self.ncols, other.nrows, "matmul: inner dimensions {} and {}", self.ncols, other.nrows);
        let rows = (0..self.nrows)
            .map(|i| {
                let mut acc: Vec<(usize, f64)> = Vec::new();
                for (k, a) in self.row(i) {
                    acc.extend(other.row(k).map(|(j, b)| (j, a * b)));
                }
                acc
            })
            .collect();
        Self::from_rows(other.ncols, rows)
    }

    /// A + B
    pub fn add(&self, other: &CsrMatrix) -> CsrMatrix {
        assert_eq!(self.shape(), other.shape(), "add: shape mismatch");
        let rows = (0..self.nrows)
            .map(|i| self.row(i).chain(other.row(i)).collect())
            .collect();
        Self::from_rows(self.ncols, rows)
    }

    pub fn scale(&self, s: f64) -> CsrMatrix {
        let mut out = self.clone();
        out.data.iter_mut().for_each(|v| *v *= s);
        out
    }

    /// A · diag(w)
    pub fn scale_columns(&self, w: &[f64]) -> CsrMatrix {
        assert_eq!(w.len(), self.ncols, "scale_columns: weight length");
        let mut out = self.clone();
        for (v, &j) in out.data.iter_mut().zip(out.indices.iter()) {
            *v *= w[j];
        }
        out
    }

    /// Rows `rows[0], rows[1], ...` of A, in that order.
    pub fn select_rows(&self, rows: &[usize]) -> CsrMatrix {
        let picked = rows.iter().map(|&i| self.row(i).collect()).collect();
        Self::from_rows(self.ncols, picked)
    }

    /// Columns `cols[0], cols[1], ...` of A, renumbered 0.. in that order.
    pub fn select_columns(&self, cols: &[usize]) -> CsrMatrix {
        let mut remap = vec![usize::MAX; self.ncols];
        for (new, &old) in cols.iter().enumerate() {
            remap[old] = new;
        }
        let rows = (0..self.nrows)
            .map(|i| {
                self.row(i)
                    .filter(|&(j, _)| remap[j] != usize::MAX)
                    .map(|(j, v)| (remap[j], v))
                    .collect()
            })
            .collect();
        Self::from_rows(cols.len(), rows)
    }

    /// [A; B]
    pub fn vstack(&self, other: &CsrMatrix) -> CsrMatrix {
        assert_eq!(self.ncols, other.ncols, "vstack: column mismatch");
        let mut out = self.clone();
        let offset = out.indices.len();
        out.indices.extend_from_slice(&other.indices);
        out.data.extend_from_slice(&other.data);
        out.indptr.extend(other.indptr[1..].iter().map(|p| p + offset));
        out.nrows += other.nrows;
        out
    }

    /// Strictly upper-triangular part (j > i).
    pub fn upper_triangle(&self) -> CsrMatrix {
        let rows = (0..self.nrows)
            .map(|i| self.row(i).filter(|&(j, _)| j > i).collect())
            .collect();
        Self::from_rows(self.ncols, rows)
    }

    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.nrows).map(|i| self.row(i).map(|(_, v)| v).sum()).collect()
    }

    /// Largest stored value, or 0 for an empty matrix.
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Dense Gram matrix AᵀA.
    pub fn gram(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.ncols, self.ncols));
        for i in 0..self.nrows {
            let (cols, vals) = self.row_slices(i);
            for (p, &j) in cols.iter().enumerate() {
                for (q, &k) in cols.iter().enumerate() {
                    out[[j, k]] += vals[p] * vals[q];
                }
            }
        }
        out
    }

    /// Frobenius norm squared.
    pub fn frobenius_sq(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }
}
