//! Batch-shape arithmetic shared by all parametrization containers.
//!
//! A container's batch shape is the common leading shape of all of its
//! fields after stripping each field's event axes. Mismatches are surfaced
//! at construction time as [`Error::Shape`], never deferred.

use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};

use crate::support::Support;
use crate::{Error, Result};

/// Compute the common batch shape of a set of fields, validating each
/// field's event shape against its support.
///
/// All fields must share exactly the same batch shape; fixed fields are
/// included (they are part of the shape contract).
pub fn common_batch_shape(fields: &[(&'static str, Support, &[usize])]) -> Result<Vec<usize>> {
    let mut batch: Option<(&'static str, Vec<usize>)> = None;
    for &(name, support, shape) in fields {
        let (field_batch, _event) = support.split_shape(name, shape)?;
        match &batch {
            None => batch = Some((name, field_batch.to_vec())),
            Some((first, expected)) => {
                if field_batch != expected.as_slice() {
                    return Err(Error::Shape(format!(
                        "field '{}' has batch shape {:?} but field '{}' has {:?}",
                        name, field_batch, first, expected
                    )));
                }
            }
        }
    }
    match batch {
        Some((_, b)) => Ok(b),
        None => Err(Error::Shape("container must declare at least one field".into())),
    }
}

/// NumPy-style broadcast of two shapes (right-aligned), or [`Error::Shape`].
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0usize; ndim];
    for i in 0..ndim {
        let da = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let db = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        out[ndim - 1 - i] = if da == db || db == 1 {
            da
        } else if da == 1 {
            db
        } else {
            return Err(Error::Shape(format!(
                "shapes {:?} and {:?} are not broadcast-compatible",
                a, b
            )));
        };
    }
    Ok(out)
}

/// Broadcast an array to a target shape, copying into an owned array.
pub fn broadcast_to(a: &ArrayViewD<'_, f64>, shape: &[usize]) -> Result<ArrayD<f64>> {
    match a.broadcast(IxDyn(shape)) {
        Some(view) => Ok(view.to_owned()),
        None => Err(Error::Shape(format!(
            "cannot broadcast shape {:?} to {:?}",
            a.shape(),
            shape
        ))),
    }
}

/// Elementwise combination of two arrays under full broadcasting.
pub fn broadcast_apply<F>(a: &ArrayViewD<'_, f64>, b: &ArrayViewD<'_, f64>, f: F) -> Result<ArrayD<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    let shape = broadcast_shapes(a.shape(), b.shape())?;
    let av = a
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| Error::Shape(format!("cannot broadcast {:?} to {:?}", a.shape(), shape)))?;
    let bv = b
        .broadcast(IxDyn(&shape))
        .ok_or_else(|| Error::Shape(format!("cannot broadcast {:?} to {:?}", b.shape(), shape)))?;
    Ok(Zip::from(&av).and(&bv).map_collect(|&x, &y| f(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    #[test]
    fn test_common_batch_shape_ok() {
        // Isotropic-normal layout: vector mean + scalar second moment.
        let batch = common_batch_shape(&[
            ("mean", Support::vector(), &[4, 2, 3]),
            ("total_second_moment", Support::scalar(), &[4, 2]),
        ])
        .unwrap();
        assert_eq!(batch, vec![4, 2]);
    }

    #[test]
    fn test_common_batch_shape_mismatch() {
        let err = common_batch_shape(&[
            ("mean", Support::vector(), &[4, 3]),
            ("total_second_moment", Support::scalar(), &[5]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("batch shape"));
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[4, 1], &[3]).unwrap(), vec![4, 3]);
        assert_eq!(broadcast_shapes(&[], &[2, 2]).unwrap(), vec![2, 2]);
        assert!(broadcast_shapes(&[4, 2], &[3]).is_err());
    }

    #[test]
    fn test_broadcast_apply() {
        let a = ArrayD::from_shape_vec(ndarray::IxDyn(&[2, 1]), vec![1.0, 2.0]).unwrap();
        let b = ArrayD::from_shape_vec(ndarray::IxDyn(&[3]), vec![10.0, 20.0, 30.0]).unwrap();
        let c = broadcast_apply(&a.view(), &b.view(), |x, y| x + y).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c[[1, 2]], 32.0);
    }
}
