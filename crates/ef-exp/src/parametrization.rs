//! The parametrization base protocol: named, support-tagged fields over a
//! common batch shape, plus the generic parameter dot product.
//!
//! Concrete families expose their fields through [`Parametrization::fields`]
//! as an explicit ordered list (the static-descriptor replacement for
//! reflection); every generic algorithm in this crate folds over that list.

use ef_core::shape::{broadcast_apply, broadcast_shapes};
use ef_core::{Error, Result, Support, SupportKind};
use ndarray::{Array2, ArrayD, ArrayViewD, Axis};

/// A view of one named parameter field and its support descriptor.
#[derive(Debug)]
pub struct Field<'a> {
    /// Field name (unique within a container).
    pub name: &'static str,
    /// The field's support descriptor.
    pub support: Support,
    /// The field's batched value; trailing axes are the event axes.
    pub value: ArrayViewD<'a, f64>,
}

impl<'a> Field<'a> {
    /// Create a field view over an owned array.
    pub fn new(name: &'static str, support: Support, value: &'a ArrayD<f64>) -> Self {
        Self { name, support, value: value.view() }
    }
}

/// Common behavior of every parameter container (natural, expectation, or
/// variance parametrization).
///
/// Containers are immutable value objects: constructors validate field
/// shapes against the declared supports and compute the batch shape once;
/// operations only ever produce new containers.
pub trait Parametrization: Sized {
    /// The ordered list of parameter fields with their supports.
    fn fields(&self) -> Vec<Field<'_>>;

    /// The batch shape (leading axes common to all fields).
    fn shape(&self) -> &[usize];

    /// Flat batch size (product of the batch shape).
    fn flat_len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Number of free (non-fixed) scalar degrees of freedom per batch element.
    fn free_degrees_of_freedom(&self) -> Result<usize> {
        let mut total = 0;
        for field in self.fields() {
            if field.support.is_fixed() {
                continue;
            }
            let (_, event) = field.support.split_shape(field.name, field.value.shape())?;
            total += field.support.degrees_of_freedom(event)?;
        }
        Ok(total)
    }

    /// Flatten the free parameters to a `(flat_batch, dof)` matrix.
    ///
    /// Scalar and vector fields contribute their entries in order; symmetric
    /// matrices contribute only their lower-triangular entries; fixed fields
    /// are skipped.
    fn flatten_free(&self) -> Result<Array2<f64>> {
        let rows = self.flat_len();
        let dof = self.free_degrees_of_freedom()?;
        let mut out = Array2::zeros((rows, dof));
        let mut col = 0;
        for field in self.fields() {
            if field.support.is_fixed() {
                continue;
            }
            let (_, event) = field.support.split_shape(field.name, field.value.shape())?;
            let event_len: usize = event.iter().product::<usize>().max(1);
            // Owned containers are standard (row-major) layout, so iteration
            // order is batch-major followed by event axes.
            let vals: Vec<f64> = field.value.iter().copied().collect();
            debug_assert_eq!(vals.len(), rows * event_len);
            match field.support.kind() {
                SupportKind::Scalar => {
                    for (i, &v) in vals.iter().enumerate() {
                        out[(i, col)] = v;
                    }
                    col += 1;
                }
                SupportKind::Vector | SupportKind::Matrix => {
                    let width = field.support.degrees_of_freedom(event)?;
                    for i in 0..rows {
                        for j in 0..width {
                            out[(i, col + j)] = vals[i * event_len + j];
                        }
                    }
                    col += width;
                }
                SupportKind::SymmetricMatrix { .. } => {
                    let n = event[0];
                    let width = n * (n + 1) / 2;
                    for i in 0..rows {
                        let mut j = 0;
                        for a in 0..n {
                            for b in 0..=a {
                                out[(i, col + j)] = vals[i * event_len + a * n + b];
                                j += 1;
                            }
                        }
                    }
                    col += width;
                }
            }
        }
        Ok(out)
    }
}

/// Sum an array over its trailing `n_axes` axes.
fn sum_trailing_axes(mut a: ArrayD<f64>, n_axes: usize) -> ArrayD<f64> {
    for _ in 0..n_axes {
        a = a.sum_axis(Axis(a.ndim() - 1));
    }
    a
}

/// The inner product between a natural and an expectation container.
///
/// Fields are paired positionally (the two sides of a family list their
/// fields in the same order) and must agree on support kind and fixedness;
/// fixed fields do not contribute. Each pair contributes the sum of
/// elementwise products over its event axes; with full-storage symmetric
/// matrices the off-diagonal terms are thereby counted twice, as the dual
/// pairing requires.
pub fn parameters_dot_product<N, E>(nat: &N, exp: &E) -> Result<ArrayD<f64>>
where
    N: Parametrization,
    E: Parametrization,
{
    let nat_fields = nat.fields();
    let exp_fields = exp.fields();
    if nat_fields.len() != exp_fields.len() {
        return Err(Error::Shape(format!(
            "field count mismatch: {} natural vs {} expectation fields",
            nat_fields.len(),
            exp_fields.len()
        )));
    }
    let mut total: Option<ArrayD<f64>> = None;
    for (a, b) in nat_fields.iter().zip(exp_fields.iter()) {
        if a.support.kind() != b.support.kind() || a.support.is_fixed() != b.support.is_fixed() {
            return Err(Error::Shape(format!(
                "fields '{}' and '{}' have incompatible supports",
                a.name, b.name
            )));
        }
        if a.support.is_fixed() {
            continue;
        }
        let product = broadcast_apply(&a.value, &b.value, |x, y| x * y)?;
        let contribution = sum_trailing_axes(product, a.support.event_arity());
        total = Some(match total {
            None => contribution,
            Some(acc) => broadcast_apply(&acc.view(), &contribution.view(), |x, y| x + y)?,
        });
    }
    total.ok_or_else(|| Error::Shape("dot product over containers with no free fields".into()))
}

/// Broadcast batch shapes of two containers participating in one operation.
pub fn common_shape<P: Parametrization, Q: Parametrization>(p: &P, q: &Q) -> Result<Vec<usize>> {
    broadcast_shapes(p.shape(), q.shape())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    struct Pair {
        eta: ArrayD<f64>,
        sigma: ArrayD<f64>,
    }

    impl Parametrization for Pair {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::new("eta", Support::vector(), &self.eta),
                Field::new("sigma", Support::symmetric_matrix(), &self.sigma),
            ]
        }

        fn shape(&self) -> &[usize] {
            &self.eta.shape()[..self.eta.ndim() - 1]
        }
    }

    fn pair(batch: usize) -> Pair {
        let eta = ArrayD::from_shape_fn(IxDyn(&[batch, 2]), |ix| (ix[0] + ix[1]) as f64 + 1.0);
        let sigma = ArrayD::from_shape_fn(IxDyn(&[batch, 2, 2]), |ix| {
            1.0 + (ix[1].min(ix[2]) + ix[0]) as f64
        });
        Pair { eta, sigma }
    }

    #[test]
    fn test_flatten_free_takes_triangular_entries() {
        let p = pair(3);
        let flat = p.flatten_free().unwrap();
        // 2 vector entries + 3 unique symmetric entries.
        assert_eq!(flat.dim(), (3, 5));
        // Row 0: eta = [1, 2], sigma = [[1, 1], [1, 2]] -> tril [1, 1, 2].
        assert_eq!(flat.row(0).to_vec(), vec![1.0, 2.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_dot_product_counts_off_diagonals_twice() {
        let p = pair(1);
        let q = pair(1);
        let dot = parameters_dot_product(&p, &q).unwrap();
        // eta.eta = 1 + 4 = 5; sigma.sigma = 1 + 1 + 1 + 4 = 7.
        assert_eq!(dot[[0]], 12.0);
    }

    #[test]
    fn test_dot_product_rejects_mismatched_supports() {
        struct Scalar {
            v: ArrayD<f64>,
        }
        impl Parametrization for Scalar {
            fn fields(&self) -> Vec<Field<'_>> {
                vec![Field::new("v", Support::scalar(), &self.v)]
            }
            fn shape(&self) -> &[usize] {
                self.v.shape()
            }
        }
        let s = Scalar { v: ArrayD::zeros(IxDyn(&[1])) };
        let p = pair(1);
        assert!(parameters_dot_product(&s, &p).is_err());
    }
}
