//! Bernoulli distribution over `{0, 1}`.
//!
//! Natural parameter: the log-odds `ln(p / (1 - p))`. Expectation parameter:
//! the success probability `p`. Both directions are closed form; the
//! conjugate prior on `p` is a beta distribution.

use ef_core::math::{log1pexp, logit, sigmoid};
use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, HasConjugatePrior, NaturalParametrization, Parametrization,
    Samplable,
};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Bernoulli as BernoulliDraw, Distribution};

use crate::beta::BetaNP;
use crate::util;

/// Natural parametrization of the Bernoulli distribution.
#[derive(Debug, Clone)]
pub struct BernoulliNP {
    log_odds: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the Bernoulli distribution.
#[derive(Debug, Clone)]
pub struct BernoulliEP {
    probability: ArrayD<f64>,
    shape: Vec<usize>,
}

impl BernoulliNP {
    /// Create from batched log-odds.
    pub fn new(log_odds: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("log_odds", Support::scalar(), log_odds.shape())])?;
        Ok(Self { log_odds, shape })
    }

    /// The log-odds `ln(p / (1 - p))`.
    pub fn log_odds(&self) -> &ArrayD<f64> {
        &self.log_odds
    }
}

impl BernoulliEP {
    /// Create from batched success probabilities.
    pub fn new(probability: ArrayD<f64>) -> Result<Self> {
        let shape =
            common_batch_shape(&[("probability", Support::scalar(), probability.shape())])?;
        Ok(Self { probability, shape })
    }

    /// The success probability.
    pub fn probability(&self) -> &ArrayD<f64> {
        &self.probability
    }
}

impl Parametrization for BernoulliNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("log_odds", Support::scalar(), &self.log_odds)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for BernoulliEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("probability", Support::scalar(), &self.probability)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for BernoulliNP {
    type Expectation = BernoulliEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        Ok(self.log_odds.mapv(log1pexp))
    }

    fn to_exp(&self) -> Result<BernoulliEP> {
        BernoulliEP::new(self.log_odds.mapv(sigmoid))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<BernoulliEP> {
        BernoulliEP::new(x.to_owned())
    }
}

impl ExpectationParametrization for BernoulliEP {
    type Natural = BernoulliNP;

    fn to_nat(&self) -> Result<BernoulliNP> {
        BernoulliNP::new(self.probability.mapv(logit))
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl HasConjugatePrior for BernoulliEP {
    type Prior = BetaNP;

    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<BetaNP> {
        let success = broadcast_apply(&self.probability.view(), n, |p, n| n * p)?;
        let failure = broadcast_apply(&self.probability.view(), n, |p, n| n * (1.0 - p))?;
        BetaNP::from_pseudo_counts(&success.view(), &failure.view())
    }

    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>> {
        Ok(self.probability.clone())
    }
}

impl Samplable for BernoulliEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let draws: Vec<BernoulliDraw> = self
            .probability
            .iter()
            .map(|&p| BernoulliDraw::new(p).map_err(|e| Error::Computation(e.to_string())))
            .collect::<Result<_>>()?;
        let repeats: usize = sample_shape.iter().product();
        let mut values = Vec::with_capacity(repeats * draws.len());
        for _ in 0..repeats {
            for d in &draws {
                values.push(if d.sample(rng) { 1.0 } else { 0.0 });
            }
        }
        util::sample_output(sample_shape, &self.shape, &[], values)
    }
}
