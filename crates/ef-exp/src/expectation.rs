//! Expectation parametrization: the dual `E[t(x)]` coordinates.
//!
//! An expectation container doubles as a sufficient-statistics accumulator:
//! the mean of `sufficient_statistics(x_i)` over i.i.d. observations is
//! itself a valid expectation container for the combined sample, which makes
//! this the natural coordinate system for maximum-likelihood estimation.

use ef_core::shape::broadcast_apply;
use ef_core::Result;
use ndarray::ArrayD;

use crate::natural::NaturalParametrization;
use crate::parametrization::{parameters_dot_product, Parametrization};

/// The expectation parametrization of an exponential family distribution.
pub trait ExpectationParametrization: Parametrization {
    /// The dual natural parametrization of the same family.
    type Natural: NaturalParametrization<Expectation = Self>;

    /// Convert to natural parameters.
    ///
    /// Closed form where one exists; families without one delegate to the
    /// iterative solver (see `ExpToNat`), so this can be expensive.
    fn to_nat(&self) -> Result<Self::Natural>;

    /// The expected carrier measure `E[k(x)]` under this distribution.
    ///
    /// Required by [`cross_entropy`](Self::cross_entropy) because `k` is not
    /// recoverable from the parameters alone; families without a closed form
    /// return [`ef_core::Error::NotImplemented`], which propagates to the
    /// entropy family of operations.
    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>>;

    /// Cross entropy `−E_self[log q(x)] = −η_q·τ + A(q) − E_self[k(x)]`,
    /// where `τ` are this container's expectation parameters.
    fn cross_entropy(&self, q: &Self::Natural) -> Result<ArrayD<f64>> {
        let dot = parameters_dot_product(q, self)?;
        let normalizer = q.log_normalizer()?;
        let carrier = self.expected_carrier_measure()?;
        let partial = broadcast_apply(&dot.view(), &normalizer.view(), |d, a| a - d)?;
        broadcast_apply(&partial.view(), &carrier.view(), |p, k| p - k)
    }

    /// Shannon entropy, defined as the self cross entropy.
    ///
    /// Can be slow: it forces a conversion to natural parameters, which may
    /// invoke the iterative solver.
    fn entropy(&self) -> Result<ArrayD<f64>> {
        self.cross_entropy(&self.to_nat()?)
    }

    /// Kullback-Leibler divergence `KL(self ‖ q)` against a prediction's
    /// natural parameters of the same family.
    ///
    /// Uses the dual form `(η_p − η_q)·τ − A(η_p) + A(η_q)`, expanded by dot
    /// linearity so that no fieldwise container subtraction is needed. Can be
    /// slow for the same reason as [`entropy`](Self::entropy).
    fn kl_divergence(&self, q: &Self::Natural) -> Result<ArrayD<f64>> {
        let p_nat = self.to_nat()?;
        let dot_p = parameters_dot_product(&p_nat, self)?;
        let dot_q = parameters_dot_product(q, self)?;
        let a_p = p_nat.log_normalizer()?;
        let a_q = q.log_normalizer()?;
        let dots = broadcast_apply(&dot_p.view(), &dot_q.view(), |p, q| p - q)?;
        let normalizers = broadcast_apply(&a_q.view(), &a_p.view(), |q, p| q - p)?;
        broadcast_apply(&dots.view(), &normalizers.view(), |d, n| d + n)
    }
}
