//! Weibull distribution with fixed concentration.
//!
//! A curved family: for fixed concentration `k`, the sufficient statistic is
//! `x^k` and the natural parameter is the negated rate of `x^k`. Both
//! conversions are closed form.

use ef_core::math::EULER_MASCHERONI;
use ef_core::shape::{broadcast_apply, broadcast_to, common_batch_shape};
use ef_core::{Result, Support};
use ef_exp::{ExpectationParametrization, Field, NaturalParametrization, Parametrization};
use ndarray::{ArrayD, ArrayViewD};

/// Natural parametrization of the Weibull distribution.
#[derive(Debug, Clone)]
pub struct WeibullNP {
    concentration: ArrayD<f64>,
    negative_rate: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the Weibull distribution.
#[derive(Debug, Clone)]
pub struct WeibullEP {
    concentration: ArrayD<f64>,
    mean_power: ArrayD<f64>,
    shape: Vec<usize>,
}

impl WeibullNP {
    /// Create from the fixed concentration and the batched negated rate of
    /// `x^k`.
    pub fn new(concentration: ArrayD<f64>, negative_rate: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("concentration", Support::scalar().fixed(), concentration.shape()),
            ("negative_rate", Support::scalar(), negative_rate.shape()),
        ])?;
        Ok(Self { concentration, negative_rate, shape })
    }

    /// The fixed concentration `k`.
    pub fn concentration(&self) -> &ArrayD<f64> {
        &self.concentration
    }

    /// The negated rate of `x^k`.
    pub fn negative_rate(&self) -> &ArrayD<f64> {
        &self.negative_rate
    }
}

impl WeibullEP {
    /// Create from the fixed concentration and the batched mean of `x^k`.
    pub fn new(concentration: ArrayD<f64>, mean_power: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("concentration", Support::scalar().fixed(), concentration.shape()),
            ("mean_power", Support::scalar(), mean_power.shape()),
        ])?;
        Ok(Self { concentration, mean_power, shape })
    }

    /// The fixed concentration `k`.
    pub fn concentration(&self) -> &ArrayD<f64> {
        &self.concentration
    }

    /// The mean of `x^k`.
    pub fn mean_power(&self) -> &ArrayD<f64> {
        &self.mean_power
    }
}

impl Parametrization for WeibullNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("concentration", Support::scalar().fixed(), &self.concentration),
            Field::new("negative_rate", Support::scalar(), &self.negative_rate),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for WeibullEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("concentration", Support::scalar().fixed(), &self.concentration),
            Field::new("mean_power", Support::scalar(), &self.mean_power),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for WeibullNP {
    type Expectation = WeibullEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        broadcast_apply(&self.negative_rate.view(), &self.concentration.view(), |nr, k| {
            -(-nr).ln() - k.ln()
        })
    }

    fn to_exp(&self) -> Result<WeibullEP> {
        WeibullEP::new(self.concentration.clone(), self.negative_rate.mapv(|nr| -1.0 / nr))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        broadcast_apply(x, &self.concentration.view(), |x, k| (k - 1.0) * x.ln())
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<WeibullEP> {
        let mean_power = broadcast_apply(x, &self.concentration.view(), |x, k| x.powf(k))?;
        let concentration = broadcast_to(&self.concentration.view(), mean_power.shape())?;
        WeibullEP::new(concentration, mean_power)
    }
}

impl ExpectationParametrization for WeibullEP {
    type Natural = WeibullNP;

    fn to_nat(&self) -> Result<WeibullNP> {
        WeibullNP::new(self.concentration.clone(), self.mean_power.mapv(|mp| -1.0 / mp))
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        // x^k is exponential with mean E[x^k], so E[ln x] is known in closed
        // form through the exponential's log-mean.
        broadcast_apply(&self.concentration.view(), &self.mean_power.view(), |k, mp| {
            (k - 1.0) / k * (-EULER_MASCHERONI + mp.ln())
        })
    }
}
