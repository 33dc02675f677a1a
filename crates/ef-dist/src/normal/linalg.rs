//! Per-element dense linear algebra over batched matrix fields.

use ef_core::{Error, Result};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{ArrayD, ArrayViewD, IxDyn};

/// Collect a batched `(.., d, d)` field into per-element dense matrices.
pub(crate) fn matrices(m: &ArrayViewD<'_, f64>, d: usize) -> Vec<DMatrix<f64>> {
    let flat: Vec<f64> = m.iter().copied().collect();
    flat.chunks(d * d).map(|c| DMatrix::from_row_slice(d, d, c)).collect()
}

/// Collect a batched `(.., d)` field into per-element dense vectors.
pub(crate) fn vectors(v: &ArrayViewD<'_, f64>, d: usize) -> Vec<DVector<f64>> {
    let flat: Vec<f64> = v.iter().copied().collect();
    flat.chunks(d).map(DVector::from_column_slice).collect()
}

/// Assemble per-element matrices back into a `(batch.., d, d)` array.
pub(crate) fn from_matrices(
    mats: &[DMatrix<f64>],
    batch: &[usize],
    d: usize,
) -> Result<ArrayD<f64>> {
    let mut values = Vec::with_capacity(mats.len() * d * d);
    for m in mats {
        for r in 0..d {
            for c in 0..d {
                values.push(m[(r, c)]);
            }
        }
    }
    let mut shape = batch.to_vec();
    shape.push(d);
    shape.push(d);
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| Error::Shape(e.to_string()))
}

/// Assemble per-element vectors back into a `(batch.., d)` array.
pub(crate) fn from_vectors(
    vecs: &[DVector<f64>],
    batch: &[usize],
    d: usize,
) -> Result<ArrayD<f64>> {
    let mut values = Vec::with_capacity(vecs.len() * d);
    for v in vecs {
        values.extend(v.iter().copied());
    }
    let mut shape = batch.to_vec();
    shape.push(d);
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| Error::Shape(e.to_string()))
}

/// Assemble per-element scalars back into a `(batch..)` array.
pub(crate) fn from_scalars(values: Vec<f64>, batch: &[usize]) -> Result<ArrayD<f64>> {
    ArrayD::from_shape_vec(IxDyn(batch), values).map_err(|e| Error::Shape(e.to_string()))
}

/// Outer products `x xᵀ` over the last axis: `(.., d)` into `(.., d, d)`.
pub(crate) fn outer_product(x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
    let d = x.shape()[x.ndim() - 1];
    let batch = &x.shape()[..x.ndim() - 1];
    let flat: Vec<f64> = x.iter().copied().collect();
    let mut values = Vec::with_capacity(flat.len() * d);
    for lane in flat.chunks(d) {
        for r in 0..d {
            for c in 0..d {
                values.push(lane[r] * lane[c]);
            }
        }
    }
    let mut shape = batch.to_vec();
    shape.push(d);
    shape.push(d);
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| Error::Shape(e.to_string()))
}

/// Cholesky factorization of a symmetric positive definite matrix, as a
/// computation error when the matrix is not positive definite.
pub(crate) fn spd_cholesky(m: DMatrix<f64>, what: &str) -> Result<Cholesky<f64, Dyn>> {
    m.cholesky()
        .ok_or_else(|| Error::Computation(format!("{}: matrix is not positive definite", what)))
}

/// Log-determinant from a Cholesky factor.
pub(crate) fn logdet(chol: &Cholesky<f64, Dyn>) -> f64 {
    2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>()
}
