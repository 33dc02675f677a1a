//! Natural parametrization: the `η` coordinates of an exponential family
//! `p(x) = exp(η·t(x) + k(x) − A(η))`.

use ef_core::shape::broadcast_apply;
use ef_core::Result;
use ndarray::{ArrayD, ArrayViewD};

use crate::expectation::ExpectationParametrization;
use crate::parametrization::{parameters_dot_product, Parametrization};

/// The natural parametrization of an exponential family distribution.
pub trait NaturalParametrization: Parametrization {
    /// The dual expectation parametrization of the same family.
    type Expectation: ExpectationParametrization<Natural = Self>;

    /// The log-normalizer `A(η)`, with the container's batch shape.
    ///
    /// Implementations must stay numerically stable at parameter-space
    /// boundaries where the closed form allows it (log-sum-exp style
    /// reductions rather than naive exponentials).
    fn log_normalizer(&self) -> Result<ArrayD<f64>>;

    /// Convert to expectation parameters `E[t(x)]`.
    ///
    /// Returns [`ef_core::Error::NotImplemented`] for families whose closed
    /// form runs in the other direction only.
    fn to_exp(&self) -> Result<Self::Expectation>;

    /// The carrier measure `k(x)` (log base measure) for a batch of
    /// observations; broadcasts against the container's batch shape.
    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>>;

    /// The sufficient statistics `t(x)` packed as an expectation container
    /// (a one-observation expectation estimate).
    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<Self::Expectation>;

    /// Log-density `η·t(x) + k(x) − A(η)`.
    fn log_pdf(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        let statistics = self.sufficient_statistics(x)?;
        let dot = parameters_dot_product(self, &statistics)?;
        let carrier = self.carrier_measure(x)?;
        let normalizer = self.log_normalizer()?;
        let energy = broadcast_apply(&dot.view(), &carrier.view(), |d, k| d + k)?;
        broadcast_apply(&energy.view(), &normalizer.view(), |e, a| e - a)
    }

    /// Density `exp(log_pdf(x))`.
    fn pdf(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(self.log_pdf(x)?.mapv(f64::exp))
    }
}
