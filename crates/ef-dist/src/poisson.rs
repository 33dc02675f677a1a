//! Poisson distribution over the non-negative integers.
//!
//! Natural parameter: the log-mean. Expectation parameter: the mean. The
//! carrier measure `-ln x!` has no closed-form expectation, so the entropy
//! family of operations is unavailable.

use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, HasConjugatePrior, NaturalParametrization, Parametrization,
    Samplable,
};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Poisson as PoissonDraw};
use statrs::function::gamma::ln_gamma;

use crate::gamma::GammaNP;
use crate::util;

/// Natural parametrization of the Poisson distribution.
#[derive(Debug, Clone)]
pub struct PoissonNP {
    log_mean: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the Poisson distribution.
#[derive(Debug, Clone)]
pub struct PoissonEP {
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

impl PoissonNP {
    /// Create from the batched log-mean.
    pub fn new(log_mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("log_mean", Support::scalar(), log_mean.shape())])?;
        Ok(Self { log_mean, shape })
    }

    /// The log-mean `ln λ`.
    pub fn log_mean(&self) -> &ArrayD<f64> {
        &self.log_mean
    }
}

impl PoissonEP {
    /// Create from the batched mean.
    pub fn new(mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("mean", Support::scalar(), mean.shape())])?;
        Ok(Self { mean, shape })
    }

    /// The mean `λ`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Parametrization for PoissonNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("log_mean", Support::scalar(), &self.log_mean)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for PoissonEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean", Support::scalar(), &self.mean)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for PoissonNP {
    type Expectation = PoissonEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        Ok(self.log_mean.mapv(f64::exp))
    }

    fn to_exp(&self) -> Result<PoissonEP> {
        PoissonEP::new(self.log_mean.mapv(f64::exp))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(x.mapv(|v| -ln_gamma(v + 1.0)))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<PoissonEP> {
        PoissonEP::new(x.to_owned())
    }
}

impl ExpectationParametrization for PoissonEP {
    type Natural = PoissonNP;

    fn to_nat(&self) -> Result<PoissonNP> {
        PoissonNP::new(self.mean.mapv(f64::ln))
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Err(Error::NotImplemented(
            "expected carrier measure of the Poisson distribution".into(),
        ))
    }
}

impl HasConjugatePrior for PoissonEP {
    type Prior = GammaNP;

    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<GammaNP> {
        let negative_rate = broadcast_apply(&self.mean.view(), n, |_, n| -n)?;
        let shape_minus_one = broadcast_apply(&self.mean.view(), n, |m, n| n * m)?;
        GammaNP::new(negative_rate, shape_minus_one)
    }

    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>> {
        Ok(self.mean.clone())
    }
}

impl Samplable for PoissonEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let draws: Vec<PoissonDraw<f64>> = self
            .mean
            .iter()
            .map(|&m| PoissonDraw::new(m).map_err(|e| Error::Computation(e.to_string())))
            .collect::<Result<_>>()?;
        let repeats: usize = sample_shape.iter().product();
        let mut values = Vec::with_capacity(repeats * draws.len());
        for _ in 0..repeats {
            for d in &draws {
                values.push(d.sample(rng));
            }
        }
        util::sample_output(sample_shape, &self.shape, &[], values)
    }
}
