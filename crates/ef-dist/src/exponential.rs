//! Exponential distribution over the positive reals.
//!
//! Natural parameter: the negated rate `-λ`. Expectation parameter: the mean
//! `1/λ`. The conjugate prior on the rate is a gamma distribution.

use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, HasConjugatePrior, NaturalParametrization, Parametrization,
    Samplable,
};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::gamma::GammaNP;
use crate::util;

/// Natural parametrization of the exponential distribution.
#[derive(Debug, Clone)]
pub struct ExponentialNP {
    negative_rate: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the exponential distribution.
#[derive(Debug, Clone)]
pub struct ExponentialEP {
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

impl ExponentialNP {
    /// Create from the batched negated rate (strictly negative values).
    pub fn new(negative_rate: ArrayD<f64>) -> Result<Self> {
        let shape =
            common_batch_shape(&[("negative_rate", Support::scalar(), negative_rate.shape())])?;
        Ok(Self { negative_rate, shape })
    }

    /// The negated rate `-λ`.
    pub fn negative_rate(&self) -> &ArrayD<f64> {
        &self.negative_rate
    }
}

impl ExponentialEP {
    /// Create from the batched mean.
    pub fn new(mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("mean", Support::scalar(), mean.shape())])?;
        Ok(Self { mean, shape })
    }

    /// The mean `1/λ`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Parametrization for ExponentialNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("negative_rate", Support::scalar(), &self.negative_rate)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for ExponentialEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean", Support::scalar(), &self.mean)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for ExponentialNP {
    type Expectation = ExponentialEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        Ok(self.negative_rate.mapv(|e| -(-e).ln()))
    }

    fn to_exp(&self) -> Result<ExponentialEP> {
        ExponentialEP::new(self.negative_rate.mapv(|e| -1.0 / e))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<ExponentialEP> {
        ExponentialEP::new(x.to_owned())
    }
}

impl ExpectationParametrization for ExponentialEP {
    type Natural = ExponentialNP;

    fn to_nat(&self) -> Result<ExponentialNP> {
        ExponentialNP::new(self.mean.mapv(|m| -1.0 / m))
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl HasConjugatePrior for ExponentialEP {
    type Prior = GammaNP;

    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<GammaNP> {
        let negative_rate = broadcast_apply(&self.mean.view(), n, |m, n| -n * m)?;
        let shape_minus_one = broadcast_apply(&self.mean.view(), n, |_, n| n)?;
        GammaNP::new(negative_rate, shape_minus_one)
    }

    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>> {
        Ok(self.mean.mapv(|m| 1.0 / m))
    }
}

impl Samplable for ExponentialEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let draws: Vec<Exp<f64>> = self
            .mean
            .iter()
            .map(|&m| Exp::new(1.0 / m).map_err(|e| Error::Computation(e.to_string())))
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scalar(v: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[1]), v)
    }

    #[test]
    fn test_roundtrip() {
        let ep = ExponentialEP::new(scalar(2.5)).unwrap();
        let back = ep.to_nat().unwrap().to_exp().unwrap();
        assert_relative_eq!(back.mean()[[0]], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_log_pdf_matches_closed_form() {
        // rate 2: log pdf(x) = ln 2 - 2x.
        let nat = ExponentialNP::new(scalar(-2.0)).unwrap();
        let x = scalar(0.7);
        assert_relative_eq!(
            nat.log_pdf(&x.view()).unwrap()[[0]],
            2.0_f64.ln() - 2.0 * 0.7,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_entropy_is_one_plus_log_mean() {
        let ep = ExponentialEP::new(scalar(3.0)).unwrap();
        assert_relative_eq!(ep.entropy().unwrap()[[0]], 1.0 + 3.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_conjugate_prior_is_gamma_over_rate() {
        let ep = ExponentialEP::new(scalar(2.0)).unwrap();
        let n = scalar(5.0);
        let prior = ep.conjugate_prior_distribution(&n.view()).unwrap();
        assert_relative_eq!(prior.negative_rate()[[0]], -10.0, epsilon = 1e-12);
        assert_relative_eq!(prior.shape_minus_one()[[0]], 5.0, epsilon = 1e-12);
        assert_relative_eq!(ep.conjugate_prior_observation().unwrap()[[0]], 0.5, epsilon = 1e-12);
    }
}
