//! Multinomial distribution with one trial (one-hot categorical).
//!
//! Observations are one-hot vectors over `K` categories; the last category is
//! the baseline, so both parametrizations carry `K - 1` components. The
//! log-normalizer appends the baseline's zero logit and reduces with a
//! max-shifted log-sum-exp, so extreme logits stay finite.

use ef_core::math::log_sum_exp_last_axis;
use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, HasConjugatePrior, Multidimensional,
    NaturalParametrization, Parametrization,
};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};

use crate::dirichlet::DirichletNP;
use crate::util;

/// Natural parametrization of the multinomial distribution.
#[derive(Debug, Clone)]
pub struct MultinomialNP {
    log_odds: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the multinomial distribution.
#[derive(Debug, Clone)]
pub struct MultinomialEP {
    probability: ArrayD<f64>,
    shape: Vec<usize>,
}

impl MultinomialNP {
    /// Create from the batched log-odds of the first `K - 1` categories
    /// against the baseline.
    pub fn new(log_odds: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("log_odds", Support::vector(), log_odds.shape())])?;
        Ok(Self { log_odds, shape })
    }

    /// The log-odds against the baseline category.
    pub fn log_odds(&self) -> &ArrayD<f64> {
        &self.log_odds
    }
}

impl MultinomialEP {
    /// Create from the batched probabilities of the first `K - 1` categories.
    pub fn new(probability: ArrayD<f64>) -> Result<Self> {
        let shape =
            common_batch_shape(&[("probability", Support::vector(), probability.shape())])?;
        Ok(Self { probability, shape })
    }

    /// The probabilities of the non-baseline categories.
    pub fn probability(&self) -> &ArrayD<f64> {
        &self.probability
    }

    /// All `K` category probabilities, with the baseline appended.
    pub fn full_probability(&self) -> Result<ArrayD<f64>> {
        let last = Axis(self.probability.ndim() - 1);
        let residual = self.probability.map_axis(last, |lane| 1.0 - lane.sum());
        let dims = self.dimensions();
        let mut values = Vec::with_capacity(self.probability.len() + residual.len());
        for (lane, &rest) in
            self.probability.lanes(last).into_iter().zip(residual.iter())
        {
            values.extend(lane.iter().copied());
            values.push(rest);
        }
        let mut shape = self.shape.clone();
        shape.push(dims + 1);
        util::array_from_vec(&shape, values)
    }
}

impl Multidimensional for MultinomialNP {
    fn dimensions(&self) -> usize {
        self.log_odds.shape()[self.log_odds.ndim() - 1]
    }
}

impl Multidimensional for MultinomialEP {
    fn dimensions(&self) -> usize {
        self.probability.shape()[self.probability.ndim() - 1]
    }
}

impl Parametrization for MultinomialNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("log_odds", Support::vector(), &self.log_odds)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for MultinomialEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("probability", Support::vector(), &self.probability)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

/// Append the baseline's zero logit along the last axis.
fn append_zero(log_odds: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let last = Axis(log_odds.ndim() - 1);
    let dims = log_odds.shape()[log_odds.ndim() - 1];
    let mut values = Vec::with_capacity(log_odds.len() + log_odds.len() / dims.max(1) + 1);
    for lane in log_odds.lanes(last) {
        values.extend(lane.iter().copied());
        values.push(0.0);
    }
    let mut shape = log_odds.shape().to_vec();
    shape[log_odds.ndim() - 1] = dims + 1;
    util::array_from_vec(&shape, values)
}

impl NaturalParametrization for MultinomialNP {
    type Expectation = MultinomialEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let appended = append_zero(&self.log_odds)?;
        Ok(log_sum_exp_last_axis(&appended.view()))
    }

    fn to_exp(&self) -> Result<MultinomialEP> {
        let normalizer =
            self.log_normalizer()?.insert_axis(Axis(self.log_odds.ndim() - 1));
        let probability =
            broadcast_apply(&self.log_odds.view(), &normalizer.view(), |e, a| (e - a).exp())?;
        MultinomialEP::new(probability)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<MultinomialEP> {
        // One-hot observations over K categories; drop the baseline count.
        let last = Axis(x.ndim() - 1);
        let dims = x.shape()[x.ndim() - 1];
        let leading = x.slice_axis(last, Slice::from(0..dims as isize - 1));
        MultinomialEP::new(leading.to_owned())
    }
}

impl ExpectationParametrization for MultinomialEP {
    type Natural = MultinomialNP;

    fn to_nat(&self) -> Result<MultinomialNP> {
        let last = Axis(self.probability.ndim() - 1);
        let residual =
            self.probability.map_axis(last, |lane| 1.0 - lane.sum()).insert_axis(last);
        let log_odds =
            broadcast_apply(&self.probability.view(), &residual.view(), |p, rest| {
                (p / rest).ln()
            })?;
        MultinomialNP::new(log_odds)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl HasConjugatePrior for MultinomialEP {
    type Prior = DirichletNP;

    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<DirichletNP> {
        let full = self.full_probability()?;
        let n_lane = n.to_owned().insert_axis(Axis(n.ndim()));
        let alpha_minus_one =
            broadcast_apply(&full.view(), &n_lane.view(), |p, n| n * p)?;
        DirichletNP::new(alpha_minus_one)
    }

    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>> {
        self.full_probability()
    }
}
