//! Conjugate-prior derivation for expectation-parametrized families.

use ef_core::Result;
use ndarray::{ArrayD, ArrayViewD};

use crate::expectation::ExpectationParametrization;
use crate::multidimensional::Multidimensional;
use crate::natural::NaturalParametrization;

/// An expectation-parametrized family with a conjugate prior.
pub trait HasConjugatePrior: ExpectationParametrization {
    /// The family of the conjugate prior.
    type Prior: NaturalParametrization;

    /// Natural parameters of the conjugate prior for `n` pseudo-observations.
    ///
    /// `n` broadcasts against the batch shape and must be non-negative for
    /// the result to be meaningful; this precondition is documented, not
    /// checked.
    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<Self::Prior>;

    /// The observation of the conjugate prior corresponding to this
    /// distribution, used for self-consistency checks.
    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>>;
}

/// A multidimensional family whose conjugate prior admits per-dimension
/// pseudo-observation counts.
pub trait HasGeneralizedConjugatePrior: HasConjugatePrior + Multidimensional {
    /// The family of the generalized conjugate prior.
    type GeneralizedPrior: NaturalParametrization;

    /// Natural parameters of the generalized conjugate prior.
    ///
    /// `n` has shape `batch + (dimensions,)`, giving each dimension its own
    /// effective sample size.
    fn generalized_conjugate_prior_distribution(
        &self,
        n: &ArrayViewD<'_, f64>,
    ) -> Result<Self::GeneralizedPrior>;
}
