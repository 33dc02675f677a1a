//! Negative binomial distribution: the count of successes before a fixed
//! number of failures. A curved family: the failure count is a fixed field
//! carried by both parametrizations, excluded from the parameter dot product
//! and the degree-of-freedom count.

use ef_core::shape::{broadcast_apply, broadcast_to, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{ExpectationParametrization, Field, NaturalParametrization, Parametrization};
use ndarray::{ArrayD, ArrayViewD};
use statrs::function::gamma::ln_gamma;

use crate::nb_common;

/// Natural parametrization of the negative binomial distribution.
#[derive(Debug, Clone)]
pub struct NegativeBinomialNP {
    failures: ArrayD<f64>,
    log_probability: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the negative binomial distribution.
#[derive(Debug, Clone)]
pub struct NegativeBinomialEP {
    failures: ArrayD<f64>,
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

impl NegativeBinomialNP {
    /// Create from the fixed failure count and the batched log success
    /// probability.
    pub fn new(failures: ArrayD<f64>, log_probability: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("failures", Support::scalar().fixed(), failures.shape()),
            ("log_probability", Support::scalar(), log_probability.shape()),
        ])?;
        Ok(Self { failures, log_probability, shape })
    }

    /// The fixed failure count `r`.
    pub fn failures(&self) -> &ArrayD<f64> {
        &self.failures
    }

    /// The log per-trial success probability `ln p`.
    pub fn log_probability(&self) -> &ArrayD<f64> {
        &self.log_probability
    }
}

impl NegativeBinomialEP {
    /// Create from the fixed failure count and the batched mean.
    pub fn new(failures: ArrayD<f64>, mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("failures", Support::scalar().fixed(), failures.shape()),
            ("mean", Support::scalar(), mean.shape()),
        ])?;
        Ok(Self { failures, mean, shape })
    }

    /// The fixed failure count `r`.
    pub fn failures(&self) -> &ArrayD<f64> {
        &self.failures
    }

    /// The mean `r p / (1 - p)`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Parametrization for NegativeBinomialNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("failures", Support::scalar().fixed(), &self.failures),
            Field::new("log_probability", Support::scalar(), &self.log_probability),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for NegativeBinomialEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("failures", Support::scalar().fixed(), &self.failures),
            Field::new("mean", Support::scalar(), &self.mean),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for NegativeBinomialNP {
    type Expectation = NegativeBinomialEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        nb_common::log_normalizer(&self.log_probability.view(), &self.failures.view())
    }

    fn to_exp(&self) -> Result<NegativeBinomialEP> {
        NegativeBinomialEP::new(
            self.failures.clone(),
            nb_common::nat_to_mean(&self.log_probability.view(), &self.failures.view())?,
        )
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        // ln C(x + r - 1, x).
        broadcast_apply(x, &self.failures.view(), |x, r| {
            ln_gamma(x + r) - ln_gamma(r) - ln_gamma(x + 1.0)
        })
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<NegativeBinomialEP> {
        let failures = broadcast_to(&self.failures.view(), x.shape())?;
        NegativeBinomialEP::new(failures, x.to_owned())
    }
}

impl ExpectationParametrization for NegativeBinomialEP {
    type Natural = NegativeBinomialNP;

    fn to_nat(&self) -> Result<NegativeBinomialNP> {
        NegativeBinomialNP::new(
            self.failures.clone(),
            nb_common::mean_to_nat(&self.mean.view(), &self.failures.view())?,
        )
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Err(Error::NotImplemented(
            "expected carrier measure of the negative binomial distribution".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    use approx::assert_relative_eq;

    fn scalar(v: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[1]), v)
    }

    #[test]
    fn test_roundtrip() {
        let ep = NegativeBinomialEP::new(scalar(4.0), scalar(2.5)).unwrap();
        let back = ep.to_nat().unwrap().to_exp().unwrap();
        assert_relative_eq!(back.mean()[[0]], 2.5, epsilon = 1e-12);
        assert_relative_eq!(back.failures()[[0]], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_pdf_matches_closed_form() {
        // r = 3, p = 0.25: P(X = 2) = C(4, 2) 0.25^2 0.75^3.
        let nat = NegativeBinomialNP::new(scalar(3.0), scalar(0.25_f64.ln())).unwrap();
        let x = scalar(2.0);
        let expected = (6.0 * 0.25_f64.powi(2) * 0.75_f64.powi(3)).ln();
        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_reduces_to_geometric_at_one_failure() {
        let nat = NegativeBinomialNP::new(scalar(1.0), scalar(0.4_f64.ln())).unwrap();
        let geometric = crate::geometric::GeometricNP::new(scalar(0.4_f64.ln())).unwrap();
        let x = scalar(5.0);
        assert_relative_eq!(
            nat.log_pdf(&x.view()).unwrap()[[0]],
            geometric.log_pdf(&x.view()).unwrap()[[0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_fixed_field_excluded_from_dof() {
        let nat = NegativeBinomialNP::new(scalar(3.0), scalar(-1.0)).unwrap();
        assert_eq!(nat.free_degrees_of_freedom().unwrap(), 1);
    }
}
