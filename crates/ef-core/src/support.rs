//! Support descriptors: the semantic shape contract of a parameter field.
//!
//! Every named field of a parametrization container carries a [`Support`]
//! describing how many trailing axes of the field are event axes (as opposed
//! to batch axes), how many independent scalar degrees of freedom the field
//! contributes, and whether the field is a fixed (non-trainable)
//! hyperparameter of a curved family.

use crate::{Error, Result};

/// The event-shape contract of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportKind {
    /// A scalar per batch element (event arity 0).
    Scalar,
    /// A vector per batch element (event arity 1).
    Vector,
    /// A square symmetric matrix per batch element (event arity 2).
    ///
    /// `unique` records whether only the lower-triangular entries are stored;
    /// with full storage the redundant upper triangle must be kept symmetric.
    SymmetricMatrix {
        /// Whether only the unique (triangular) entries are stored.
        unique: bool,
    },
    /// A general (possibly rectangular) matrix per batch element.
    Matrix,
}

/// Descriptor attached to a parametrization field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Support {
    kind: SupportKind,
    fixed: bool,
}

impl Support {
    /// Scalar support.
    pub const fn scalar() -> Self {
        Self { kind: SupportKind::Scalar, fixed: false }
    }

    /// Vector support.
    pub const fn vector() -> Self {
        Self { kind: SupportKind::Vector, fixed: false }
    }

    /// Symmetric-matrix support with full (redundant) storage.
    pub const fn symmetric_matrix() -> Self {
        Self { kind: SupportKind::SymmetricMatrix { unique: false }, fixed: false }
    }

    /// Symmetric-matrix support storing only the unique triangular entries.
    pub const fn symmetric_matrix_unique() -> Self {
        Self { kind: SupportKind::SymmetricMatrix { unique: true }, fixed: false }
    }

    /// General-matrix support.
    pub const fn matrix() -> Self {
        Self { kind: SupportKind::Matrix, fixed: false }
    }

    /// Mark this field as a fixed (non-trainable) hyperparameter.
    ///
    /// Fixed fields participate in shape computation but are excluded from
    /// the parameter dot product, flattening, and degree-of-freedom counts.
    /// This is the explicit boundary between the shape contract and the
    /// differentiable parameter set of a curved family.
    pub const fn fixed(self) -> Self {
        Self { kind: self.kind, fixed: true }
    }

    /// The event-shape kind.
    pub const fn kind(&self) -> SupportKind {
        self.kind
    }

    /// Whether this field is a fixed hyperparameter.
    pub const fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Number of trailing event axes.
    pub const fn event_arity(&self) -> usize {
        match self.kind {
            SupportKind::Scalar => 0,
            SupportKind::Vector => 1,
            SupportKind::SymmetricMatrix { .. } | SupportKind::Matrix => 2,
        }
    }

    /// Whether values produced for this field by generic operations should be
    /// re-symmetrized (full-storage symmetric matrices only).
    pub const fn should_symmetrize(&self) -> bool {
        matches!(self.kind, SupportKind::SymmetricMatrix { unique: false })
    }

    /// Split a field's full shape into `(batch, event)` parts, validating the
    /// event part against this support.
    pub fn split_shape<'a>(
        &self,
        name: &str,
        shape: &'a [usize],
    ) -> Result<(&'a [usize], &'a [usize])> {
        let arity = self.event_arity();
        if shape.len() < arity {
            return Err(Error::Shape(format!(
                "field '{}' needs at least {} event axes, got shape {:?}",
                name, arity, shape
            )));
        }
        let split = shape.len() - arity;
        let (batch, event) = shape.split_at(split);
        if let SupportKind::SymmetricMatrix { .. } = self.kind {
            if event[0] != event[1] {
                return Err(Error::Shape(format!(
                    "field '{}' must have a square event shape, got {:?}",
                    name, event
                )));
            }
        }
        Ok((batch, event))
    }

    /// Number of independent scalar degrees of freedom for a field with the
    /// given event shape. Symmetric matrices count `n (n + 1) / 2` entries
    /// whether or not the redundant upper triangle is stored.
    pub fn degrees_of_freedom(&self, event_shape: &[usize]) -> Result<usize> {
        match self.kind {
            SupportKind::Scalar => Ok(1),
            SupportKind::Vector => Ok(event_shape[0]),
            SupportKind::SymmetricMatrix { .. } => {
                let n = event_shape[0];
                if event_shape[1] != n {
                    return Err(Error::Shape(format!(
                        "symmetric matrix must be square, got {:?}",
                        event_shape
                    )));
                }
                Ok(n * (n + 1) / 2)
            }
            SupportKind::Matrix => Ok(event_shape[0] * event_shape[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_and_dof() {
        assert_eq!(Support::scalar().event_arity(), 0);
        assert_eq!(Support::scalar().degrees_of_freedom(&[]).unwrap(), 1);
        assert_eq!(Support::vector().event_arity(), 1);
        assert_eq!(Support::vector().degrees_of_freedom(&[4]).unwrap(), 4);
        assert_eq!(Support::symmetric_matrix().degrees_of_freedom(&[3, 3]).unwrap(), 6);
        assert_eq!(Support::matrix().degrees_of_freedom(&[2, 5]).unwrap(), 10);
    }

    #[test]
    fn test_split_shape() {
        let (batch, event) = Support::vector().split_shape("mean", &[7, 2, 3]).unwrap();
        assert_eq!(batch, &[7, 2]);
        assert_eq!(event, &[3]);

        let (batch, event) =
            Support::symmetric_matrix().split_shape("second_moment", &[5, 3, 3]).unwrap();
        assert_eq!(batch, &[5]);
        assert_eq!(event, &[3, 3]);
    }

    #[test]
    fn test_split_shape_rejects_bad_shapes() {
        assert!(Support::symmetric_matrix().split_shape("m", &[3]).is_err());
        assert!(Support::symmetric_matrix().split_shape("m", &[4, 3, 2]).is_err());
    }

    #[test]
    fn test_fixed_flag() {
        let s = Support::scalar().fixed();
        assert!(s.is_fixed());
        assert!(!Support::scalar().is_fixed());
        assert_eq!(s.event_arity(), 0);
    }

    #[test]
    fn test_symmetrization_contract() {
        assert!(Support::symmetric_matrix().should_symmetrize());
        assert!(!Support::symmetric_matrix_unique().should_symmetrize());
        assert!(!Support::matrix().should_symmetrize());
    }
}
