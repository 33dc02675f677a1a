//! Beta distribution over `(0, 1)`.
//!
//! A two-component Dirichlet with scalar observations: the sufficient
//! statistic of `x` is the pair `(ln x, ln(1 - x))` and the natural parameter
//! holds both concentrations minus one. The reverse conversion runs through
//! the Newton solver, as for the Dirichlet.

use ef_core::math::{inverse_softplus, softplus};
use ef_core::shape::common_batch_shape;
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, Field, NaturalParametrization,
    Parametrization,
};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};
use statrs::function::gamma::{digamma, ln_gamma};

use crate::util;

/// Natural parametrization of the beta distribution: `(α - 1, β - 1)`.
#[derive(Debug, Clone)]
pub struct BetaNP {
    alpha_minus_one: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the beta distribution:
/// `(E[ln x], E[ln(1 - x)])`.
#[derive(Debug, Clone)]
pub struct BetaEP {
    mean_log_probability: ArrayD<f64>,
    shape: Vec<usize>,
}

fn check_two_components(name: &str, value: &ArrayD<f64>) -> Result<()> {
    let event = value.shape()[value.ndim() - 1];
    if event != 2 {
        return Err(Error::Shape(format!(
            "field '{}' must have exactly 2 components, got {}",
            name, event
        )));
    }
    Ok(())
}

impl BetaNP {
    /// Create from the batched concentration pair minus one, shape `(.., 2)`.
    pub fn new(alpha_minus_one: ArrayD<f64>) -> Result<Self> {
        check_two_components("alpha_minus_one", &alpha_minus_one)?;
        let shape = common_batch_shape(&[(
            "alpha_minus_one",
            Support::vector(),
            alpha_minus_one.shape(),
        )])?;
        Ok(Self { alpha_minus_one, shape })
    }

    /// Create from separate pseudo-count arrays `α - 1` and `β - 1`.
    pub fn from_pseudo_counts(
        alpha_minus_one: &ArrayViewD<'_, f64>,
        beta_minus_one: &ArrayViewD<'_, f64>,
    ) -> Result<Self> {
        if alpha_minus_one.shape() != beta_minus_one.shape() {
            return Err(Error::Shape(format!(
                "pseudo-count shapes {:?} and {:?} differ",
                alpha_minus_one.shape(),
                beta_minus_one.shape()
            )));
        }
        let mut values = Vec::with_capacity(alpha_minus_one.len() * 2);
        for (&a, &b) in alpha_minus_one.iter().zip(beta_minus_one.iter()) {
            values.push(a);
            values.push(b);
        }
        let mut shape = alpha_minus_one.shape().to_vec();
        shape.push(2);
        Self::new(util::array_from_vec(&shape, values)?)
    }

    /// The concentration pair minus one.
    pub fn alpha_minus_one(&self) -> &ArrayD<f64> {
        &self.alpha_minus_one
    }
}

impl BetaEP {
    /// Create from the batched mean log pair, shape `(.., 2)`.
    pub fn new(mean_log_probability: ArrayD<f64>) -> Result<Self> {
        check_two_components("mean_log_probability", &mean_log_probability)?;
        let shape = common_batch_shape(&[(
            "mean_log_probability",
            Support::vector(),
            mean_log_probability.shape(),
        )])?;
        Ok(Self { mean_log_probability, shape })
    }

    /// The pair `(E[ln x], E[ln(1 - x)])`.
    pub fn mean_log_probability(&self) -> &ArrayD<f64> {
        &self.mean_log_probability
    }
}

impl Parametrization for BetaNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("alpha_minus_one", Support::vector(), &self.alpha_minus_one)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for BetaEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean_log_probability", Support::vector(), &self.mean_log_probability)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for BetaNP {
    type Expectation = BetaEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let last = Axis(self.alpha_minus_one.ndim() - 1);
        Ok(self.alpha_minus_one.map_axis(last, |lane| {
            let a = lane[0] + 1.0;
            let b = lane[1] + 1.0;
            ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
        }))
    }

    fn to_exp(&self) -> Result<BetaEP> {
        let last = Axis(self.alpha_minus_one.ndim() - 1);
        let mut out = self.alpha_minus_one.clone();
        for mut lane in out.lanes_mut(last) {
            let a = lane[0] + 1.0;
            let b = lane[1] + 1.0;
            let total = digamma(a + b);
            lane[0] = digamma(a) - total;
            lane[1] = digamma(b) - total;
        }
        BetaEP::new(out)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<BetaEP> {
        let mut values = Vec::with_capacity(x.len() * 2);
        for &v in x.iter() {
            values.push(v.ln());
            values.push((1.0 - v).ln());
        }
        let mut shape = x.shape().to_vec();
        shape.push(2);
        BetaEP::new(util::array_from_vec(&shape, values)?)
    }
}

impl ExpectationParametrization for BetaEP {
    type Natural = BetaNP;

    fn to_nat(&self) -> Result<BetaNP> {
        self.solve_to_nat(&ExpToNatOptions::default())
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl ExpToNat for BetaEP {
    fn initial_search_parameters(&self) -> Result<Array2<f64>> {
        let rows = self.flat_len();
        Ok(Array2::from_elem((rows, 2), inverse_softplus(1.0)))
    }

    fn search_to_natural(&self, search: &ArrayView2<'_, f64>) -> Result<BetaNP> {
        let values: Vec<f64> = search.iter().map(|&z| softplus(z) - 1.0).collect();
        let mut shape = self.shape.clone();
        shape.push(2);
        BetaNP::new(util::array_from_vec(&shape, values)?)
    }
}
