//! Geometric distribution over the non-negative integers: the number of
//! successes before the first failure. The negative binomial with one
//! failure, so the binomial-coefficient carrier vanishes.

use ef_core::shape::common_batch_shape;
use ef_core::{Result, Support};
use ef_exp::{ExpectationParametrization, Field, NaturalParametrization, Parametrization};
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::nb_common;

/// Natural parametrization of the geometric distribution.
#[derive(Debug, Clone)]
pub struct GeometricNP {
    log_probability: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the geometric distribution.
#[derive(Debug, Clone)]
pub struct GeometricEP {
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

impl GeometricNP {
    /// Create from the batched log success probability (strictly negative).
    pub fn new(log_probability: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[(
            "log_probability",
            Support::scalar(),
            log_probability.shape(),
        )])?;
        Ok(Self { log_probability, shape })
    }

    /// The log per-trial success probability `ln p`.
    pub fn log_probability(&self) -> &ArrayD<f64> {
        &self.log_probability
    }
}

impl GeometricEP {
    /// Create from the batched mean.
    pub fn new(mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("mean", Support::scalar(), mean.shape())])?;
        Ok(Self { mean, shape })
    }

    /// The mean `p / (1 - p)`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Parametrization for GeometricNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("log_probability", Support::scalar(), &self.log_probability)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for GeometricEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean", Support::scalar(), &self.mean)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for GeometricNP {
    type Expectation = GeometricEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let one = ArrayD::ones(IxDyn(&self.shape));
        nb_common::log_normalizer(&self.log_probability.view(), &one.view())
    }

    fn to_exp(&self) -> Result<GeometricEP> {
        let one = ArrayD::ones(IxDyn(&self.shape));
        GeometricEP::new(nb_common::nat_to_mean(&self.log_probability.view(), &one.view())?)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<GeometricEP> {
        GeometricEP::new(x.to_owned())
    }
}

impl ExpectationParametrization for GeometricEP {
    type Natural = GeometricNP;

    fn to_nat(&self) -> Result<GeometricNP> {
        let one = ArrayD::ones(IxDyn(&self.shape));
        GeometricNP::new(nb_common::mean_to_nat(&self.mean.view(), &one.view())?)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}
