//! Mathematical primitives for 2-D size-distribution inversion.

pub mod interp;
pub mod linalg;
pub mod nnls;
pub mod sparse;
