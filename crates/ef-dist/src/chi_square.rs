//! Chi-square distribution over the positive reals.
//!
//! Natural parameter: `k/2 - 1` for `k` degrees of freedom, with sufficient
//! statistic `ln x` and carrier measure `-x/2`. The expectation parameter is
//! the mean log, and converting it back requires inverting the digamma
//! function, which runs through the Newton solver.

use std::f64::consts::LN_2;

use ef_core::math::EULER_MASCHERONI;
use ef_core::shape::common_batch_shape;
use ef_core::{Result, Support};
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, Field, NaturalParametrization,
    Parametrization,
};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD};
use statrs::function::gamma::{digamma, ln_gamma};

use crate::util;

/// Natural parametrization of the chi-square distribution.
#[derive(Debug, Clone)]
pub struct ChiSquareNP {
    half_dof_minus_one: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the chi-square distribution.
#[derive(Debug, Clone)]
pub struct ChiSquareEP {
    mean_log: ArrayD<f64>,
    shape: Vec<usize>,
}

impl ChiSquareNP {
    /// Create from the batched natural parameter `k/2 - 1`.
    pub fn new(half_dof_minus_one: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[(
            "half_dof_minus_one",
            Support::scalar(),
            half_dof_minus_one.shape(),
        )])?;
        Ok(Self { half_dof_minus_one, shape })
    }

    /// The natural parameter `k/2 - 1`.
    pub fn half_dof_minus_one(&self) -> &ArrayD<f64> {
        &self.half_dof_minus_one
    }
}

impl ChiSquareEP {
    /// Create from the batched mean log `E[ln x]`.
    pub fn new(mean_log: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("mean_log", Support::scalar(), mean_log.shape())])?;
        Ok(Self { mean_log, shape })
    }

    /// The mean log `E[ln x] = ψ(k/2) + ln 2`.
    pub fn mean_log(&self) -> &ArrayD<f64> {
        &self.mean_log
    }
}

impl Parametrization for ChiSquareNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("half_dof_minus_one", Support::scalar(), &self.half_dof_minus_one)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for ChiSquareEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean_log", Support::scalar(), &self.mean_log)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for ChiSquareNP {
    type Expectation = ChiSquareEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        Ok(self.half_dof_minus_one.mapv(|e| {
            let half_k = e + 1.0;
            ln_gamma(half_k) + half_k * LN_2
        }))
    }

    fn to_exp(&self) -> Result<ChiSquareEP> {
        ChiSquareEP::new(self.half_dof_minus_one.mapv(|e| digamma(e + 1.0) + LN_2))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(x.mapv(|v| -v / 2.0))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<ChiSquareEP> {
        ChiSquareEP::new(x.mapv(f64::ln))
    }
}

impl ExpectationParametrization for ChiSquareEP {
    type Natural = ChiSquareNP;

    fn to_nat(&self) -> Result<ChiSquareNP> {
        self.solve_to_nat(&ExpToNatOptions::default())
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        // E[-x/2] = -k/2; recovering k forces a solve.
        let nat = self.to_nat()?;
        Ok(nat.half_dof_minus_one.mapv(|e| -(e + 1.0)))
    }
}

/// Starting point for inverting `ψ(h) = y` (Minka's approximation).
fn inverse_digamma_estimate(y: f64) -> f64 {
    if y >= -2.22 {
        y.exp() + 0.5
    } else {
        -1.0 / (y + EULER_MASCHERONI)
    }
}

impl ExpToNat for ChiSquareEP {
    fn initial_search_parameters(&self) -> Result<Array2<f64>> {
        let rows = self.flat_len();
        let mut out = Array2::zeros((rows, 1));
        for (i, &ml) in self.mean_log.iter().enumerate() {
            let half_k = inverse_digamma_estimate(ml - LN_2).max(1e-8);
            out[(i, 0)] = half_k.ln();
        }
        Ok(out)
    }

    fn search_to_natural(&self, search: &ArrayView2<'_, f64>) -> Result<ChiSquareNP> {
        let values: Vec<f64> = search.column(0).iter().map(|&z| z.exp() - 1.0).collect();
        ChiSquareNP::new(util::array_from_vec(&self.shape, values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::IxDyn;

    fn scalar(v: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[1]), v)
    }

    #[test]
    fn test_log_pdf_matches_closed_form() {
        // k = 4: log pdf(x) = ln x - x/2 - ln Γ(2) - 2 ln 2.
        let nat = ChiSquareNP::new(scalar(1.0)).unwrap();
        let x = scalar(3.0);
        let expected = 3.0_f64.ln() - 1.5 - 2.0 * LN_2;
        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_solver_inverts_digamma() {
        for k in [1.0, 2.0, 7.0, 30.0] {
            let nat = ChiSquareNP::new(scalar(k / 2.0 - 1.0)).unwrap();
            let back = nat.to_exp().unwrap().to_nat().unwrap();
            assert_relative_eq!(
                back.half_dof_minus_one()[[0]],
                k / 2.0 - 1.0,
                max_relative = 1e-6,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_expected_carrier_is_negative_half_mean() {
        let nat = ChiSquareNP::new(scalar(2.0)).unwrap(); // k = 6
        let expected_carrier =
            nat.to_exp().unwrap().expected_carrier_measure().unwrap();
        assert_relative_eq!(expected_carrier[[0]], -3.0, max_relative = 1e-6);
    }
}
