//! Dirichlet distribution over the probability simplex.
//!
//! Natural parameter: `α - 1` over all components, with sufficient statistic
//! `ln x`. Expectation parameter: the component-wise mean log probability
//! `ψ(α_i) - ψ(Σα)`. The reverse conversion runs through the Newton solver
//! with a softplus reparametrization keeping every `α` positive.

use ef_core::math::{inverse_softplus, softplus};
use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, Field, Multidimensional,
    NaturalParametrization, Parametrization, Samplable,
};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Gamma as GammaDraw};
use statrs::function::gamma::{digamma, ln_gamma};

use crate::util;

/// Natural parametrization of the Dirichlet distribution.
#[derive(Debug, Clone)]
pub struct DirichletNP {
    alpha_minus_one: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the Dirichlet distribution.
#[derive(Debug, Clone)]
pub struct DirichletEP {
    mean_log_probability: ArrayD<f64>,
    shape: Vec<usize>,
}

impl DirichletNP {
    /// Create from the batched concentration vector minus one.
    pub fn new(alpha_minus_one: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[(
            "alpha_minus_one",
            Support::vector(),
            alpha_minus_one.shape(),
        )])?;
        Ok(Self { alpha_minus_one, shape })
    }

    /// The concentration vector minus one, `α - 1`.
    pub fn alpha_minus_one(&self) -> &ArrayD<f64> {
        &self.alpha_minus_one
    }
}

impl DirichletEP {
    /// Create from the batched mean log probabilities.
    pub fn new(mean_log_probability: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[(
            "mean_log_probability",
            Support::vector(),
            mean_log_probability.shape(),
        )])?;
        Ok(Self { mean_log_probability, shape })
    }

    /// The component-wise `E[ln x_i]`.
    pub fn mean_log_probability(&self) -> &ArrayD<f64> {
        &self.mean_log_probability
    }
}

impl Multidimensional for DirichletNP {
    fn dimensions(&self) -> usize {
        self.alpha_minus_one.shape()[self.alpha_minus_one.ndim() - 1]
    }
}

impl Multidimensional for DirichletEP {
    fn dimensions(&self) -> usize {
        self.mean_log_probability.shape()[self.mean_log_probability.ndim() - 1]
    }
}

impl Parametrization for DirichletNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("alpha_minus_one", Support::vector(), &self.alpha_minus_one)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for DirichletEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean_log_probability", Support::vector(), &self.mean_log_probability)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for DirichletNP {
    type Expectation = DirichletEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let last = Axis(self.alpha_minus_one.ndim() - 1);
        Ok(self.alpha_minus_one.map_axis(last, |lane| {
            let mut total = 0.0;
            let mut alpha_sum = 0.0;
            for &v in lane {
                let alpha = v + 1.0;
                total += ln_gamma(alpha);
                alpha_sum += alpha;
            }
            total - ln_gamma(alpha_sum)
        }))
    }

    fn to_exp(&self) -> Result<DirichletEP> {
        let last = Axis(self.alpha_minus_one.ndim() - 1);
        let alpha = self.alpha_minus_one.mapv(|v| v + 1.0);
        let total = alpha.map_axis(last, |lane| digamma(lane.sum())).insert_axis(last);
        let component = alpha.mapv(digamma);
        let mean_log = broadcast_apply(&component.view(), &total.view(), |c, t| c - t)?;
        DirichletEP::new(mean_log)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<DirichletEP> {
        DirichletEP::new(x.mapv(f64::ln))
    }
}

impl ExpectationParametrization for DirichletEP {
    type Natural = DirichletNP;

    fn to_nat(&self) -> Result<DirichletNP> {
        self.solve_to_nat(&ExpToNatOptions::default())
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl ExpToNat for DirichletEP {
    fn initial_search_parameters(&self) -> Result<Array2<f64>> {
        // Uniform concentration start.
        let rows = self.flat_len();
        let dims = self.dimensions();
        Ok(Array2::from_elem((rows, dims), inverse_softplus(1.0)))
    }

    fn search_to_natural(&self, search: &ArrayView2<'_, f64>) -> Result<DirichletNP> {
        let values: Vec<f64> = search.iter().map(|&z| softplus(z) - 1.0).collect();
        let mut shape = self.shape.clone();
        shape.push(self.dimensions());
        DirichletNP::new(util::array_from_vec(&shape, values)?)
    }
}

impl Samplable for DirichletNP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let dims = self.dimensions();
        let draws: Vec<GammaDraw<f64>> = self
            .alpha_minus_one
            .iter()
            .map(|&v| {
                GammaDraw::new(v + 1.0, 1.0).map_err(|e| Error::Computation(e.to_string()))
            })
            .collect::<Result<_>>()?;
        let repeats: usize = sample_shape.iter().product();
        let mut values = Vec::with_capacity(repeats * draws.len());
        for _ in 0..repeats {
            for lane in draws.chunks(dims) {
                let parts: Vec<f64> = lane.iter().map(|d| d.sample(rng)).collect();
                let total: f64 = parts.iter().sum();
                values.extend(parts.iter().map(|p| p / total));
            }
        }
        util::sample_output(sample_shape, &self.shape, &[dims], values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn concentration(alpha: &[f64]) -> DirichletNP {
        let v: Vec<f64> = alpha.iter().map(|a| a - 1.0).collect();
        DirichletNP::new(ArrayD::from_shape_vec(IxDyn(&[1, alpha.len()]), v).unwrap()).unwrap()
    }

    #[test]
    fn test_log_normalizer_is_log_beta_function() {
        // B(2, 3) = Γ(2)Γ(3)/Γ(5) = 2/24.
        let nat = concentration(&[2.0, 3.0]);
        assert_relative_eq!(
            nat.log_normalizer().unwrap()[[0]],
            (2.0_f64 / 24.0).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_to_exp_matches_digamma() {
        let nat = concentration(&[2.0, 3.0]);
        let ep = nat.to_exp().unwrap();
        assert_relative_eq!(
            ep.mean_log_probability()[[0, 0]],
            digamma(2.0) - digamma(5.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_solver_roundtrip() {
        let nat = concentration(&[0.5, 2.0, 7.0]);
        let back = nat.to_exp().unwrap().to_nat().unwrap();
        for (i, alpha) in [0.5, 2.0, 7.0].iter().enumerate() {
            assert_relative_eq!(
                back.alpha_minus_one()[[0, i]],
                alpha - 1.0,
                max_relative = 1e-5,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_log_pdf_of_uniform_simplex() {
        // α = (1, 1): the uniform density on the 1-simplex is 1 everywhere.
        let nat = concentration(&[1.0, 1.0]);
        let x = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.3, 0.7]).unwrap();
        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], 0.0, epsilon = 1e-12);
    }
}
