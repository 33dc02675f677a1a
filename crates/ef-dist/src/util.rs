//! Internal array-assembly helpers shared by the family implementations.

use ef_core::{Error, Result};
use ndarray::{ArrayD, IxDyn};

/// Build an owned dynamic array from row-major values.
pub(crate) fn array_from_vec(shape: &[usize], values: Vec<f64>) -> Result<ArrayD<f64>> {
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::Shape(e.to_string()))
}

/// Assemble a draw with shape `sample_shape + batch_shape + event_shape`
/// from values produced in row-major order.
pub(crate) fn sample_output(
    sample_shape: &[usize],
    batch_shape: &[usize],
    event_shape: &[usize],
    values: Vec<f64>,
) -> Result<ArrayD<f64>> {
    let mut shape =
        Vec::with_capacity(sample_shape.len() + batch_shape.len() + event_shape.len());
    shape.extend_from_slice(sample_shape);
    shape.extend_from_slice(batch_shape);
    shape.extend_from_slice(event_shape);
    array_from_vec(&shape, values)
}
