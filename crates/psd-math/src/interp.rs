//! Bilinear interpolation weights on rectilinear axes.
//!
//! Grid-to-grid transforms are assembled from these weights, so they are
//! returned as (index, weight) stencils rather than interpolated values.
//! Queries outside the axis range yield no stencil, which callers treat
//! as a zero contribution.

/// Tolerance, relative to axis extent, for accepting queries on the end points.
const EDGE_TOL: f64 = 1e-12;

/// Linear interpolation stencil on a strictly increasing axis.
///
/// Returns `(i0, i1, t)` with the interpolated value `(1 - t) f[i0] + t f[i1]`,
/// or `None` when `q` lies outside `[axis[0], axis[n-1]]`.
pub fn interp1_weights(axis: &[f64], q: f64) -> Option<(usize, usize, f64)> {
    let n = axis.len();
    if n == 0 || !q.is_finite() {
        return None;
    }
    let lo = axis[0];
    let hi = axis[n - 1];
    let tol = EDGE_TOL * (hi - lo).abs().max(lo.abs()).max(1.0);
    if q < lo - tol || q > hi + tol {
        return None;
    }
    if n == 1 {
        return Some((0, 0, 0.0));
    }

    // First node strictly greater than q, clamped to a valid segment
    let upper = axis.partition_point(|&a| a <= q).clamp(1, n - 1);
    let i0 = upper - 1;
    let i1 = upper;
    let t = ((q - axis[i0]) / (axis[i1] - axis[i0])).clamp(0.0, 1.0);
    Some((i0, i1, t))
}

/// Bilinear stencil `[(i, j, w); 4]` for query `(q1, q2)` on axes `axis1 × axis2`.
///
/// Weights sum to one. Entries may repeat an index pair when the query sits
/// on a node or an axis has a single point; callers must accumulate.
pub fn bilinear_weights(
    axis1: &[f64],
    axis2: &[f64],
    q1: f64,
    q2: f64,
) -> Option<[(usize, usize, f64); 4]> {
    let (i0, i1, t1) = interp1_weights(axis1, q1)?;
    let (j0, j1, t2) = interp1_weights(axis2, q2)?;
    Some([
        (i0, j0, (1.0 - t1) * (1.0 - t2)),
        (i1, j0, t1 * (1.0 - t2)),
        (i0, j1, (1.0 - t1) * t2),
        (i1, j1, t1 * t2),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interp1_exact_node() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        let (i0, i1, t) = interp1_weights(&axis, 2.0).unwrap();
        let v = [10.0, 11.0, 12.0, 13.0];
        let val = (1.0 - t) * v[i0] + t * v[i1];
        assert!((val - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_interp1_midpoint() {
        let axis = [0.0, 1.0, 2.0];
        let (i0, i1, t) = interp1_weights(&axis, 0.25).unwrap();
        assert_eq!((i0, i1), (0, 1));
        assert!((t - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_interp1_out_of_range() {
        let axis = [0.0, 1.0];
        assert!(interp1_weights(&axis, -0.1).is_none());
        assert!(interp1_weights(&axis, 1.1).is_none());
        assert!(interp1_weights(&axis, 1.0).is_some());
    }

    #[test]
    fn test_interp1_single_point() {
        assert_eq!(interp1_weights(&[5.0], 5.0), Some((0, 0, 0.0)));
        assert!(interp1_weights(&[5.0], 5.5).is_none());
    }

    #[test]
    fn test_bilinear_reproduces_linear_field() {
        let a1 = [0.0, 1.0, 2.0, 3.0];
        let a2 = [0.0, 2.0, 4.0];
        let f = |x: f64, y: f64| 2.0 * x + 3.0 * y;
        let st = bilinear_weights(&a1, &a2, 1.3, 2.7).unwrap();
        let val: f64 = st.iter().map(|&(i, j, w)| w * f(a1[i], a2[j])).sum();
        assert!((val - f(1.3, 2.7)).abs() < 1e-12, "val = {val}");
        let wsum: f64 = st.iter().map(|s| s.2).sum();
        assert!((wsum - 1.0).abs() < 1e-12);
    }
}
