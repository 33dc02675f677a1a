//! Gamma distribution over the positive reals.
//!
//! Natural parameters: the negated rate and `shape - 1`. Expectation
//! parameters: the mean and the mean log. The expectation-to-natural
//! direction has no closed form and runs through the Newton solver, searching
//! over the log of the shape parameter only: for any candidate shape the rate
//! matching the target mean is known in closed form, which leaves a single
//! digamma residual per batch element.

use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, Field, NaturalParametrization,
    Parametrization, Samplable,
};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Gamma as GammaDraw};
use statrs::function::gamma::{digamma, ln_gamma};

use crate::util;

/// Natural parametrization of the gamma distribution.
#[derive(Debug, Clone)]
pub struct GammaNP {
    negative_rate: ArrayD<f64>,
    shape_minus_one: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the gamma distribution.
#[derive(Debug, Clone)]
pub struct GammaEP {
    mean: ArrayD<f64>,
    mean_log: ArrayD<f64>,
    shape: Vec<usize>,
}

impl GammaNP {
    /// Create from the batched negated rate and shape-minus-one.
    pub fn new(negative_rate: ArrayD<f64>, shape_minus_one: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("negative_rate", Support::scalar(), negative_rate.shape()),
            ("shape_minus_one", Support::scalar(), shape_minus_one.shape()),
        ])?;
        Ok(Self { negative_rate, shape_minus_one, shape })
    }

    /// The negated rate `-β`.
    pub fn negative_rate(&self) -> &ArrayD<f64> {
        &self.negative_rate
    }

    /// The shape parameter minus one, `α - 1`.
    pub fn shape_minus_one(&self) -> &ArrayD<f64> {
        &self.shape_minus_one
    }
}

impl GammaEP {
    /// Create from the batched mean and mean log.
    pub fn new(mean: ArrayD<f64>, mean_log: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::scalar(), mean.shape()),
            ("mean_log", Support::scalar(), mean_log.shape()),
        ])?;
        Ok(Self { mean, mean_log, shape })
    }

    /// The mean `E[x] = α/β`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The mean log `E[ln x] = ψ(α) - ln β`.
    pub fn mean_log(&self) -> &ArrayD<f64> {
        &self.mean_log
    }
}

impl Parametrization for GammaNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("negative_rate", Support::scalar(), &self.negative_rate),
            Field::new("shape_minus_one", Support::scalar(), &self.shape_minus_one),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for GammaEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::scalar(), &self.mean),
            Field::new("mean_log", Support::scalar(), &self.mean_log),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for GammaNP {
    type Expectation = GammaEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        broadcast_apply(&self.negative_rate.view(), &self.shape_minus_one.view(), |nr, sm| {
            let alpha = sm + 1.0;
            ln_gamma(alpha) - alpha * (-nr).ln()
        })
    }

    fn to_exp(&self) -> Result<GammaEP> {
        let mean = broadcast_apply(
            &self.negative_rate.view(),
            &self.shape_minus_one.view(),
            |nr, sm| -(sm + 1.0) / nr,
        )?;
        let mean_log = broadcast_apply(
            &self.negative_rate.view(),
            &self.shape_minus_one.view(),
            |nr, sm| digamma(sm + 1.0) - (-nr).ln(),
        )?;
        GammaEP::new(mean, mean_log)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<GammaEP> {
        GammaEP::new(x.to_owned(), x.mapv(f64::ln))
    }
}

impl ExpectationParametrization for GammaEP {
    type Natural = GammaNP;

    fn to_nat(&self) -> Result<GammaNP> {
        self.solve_to_nat(&ExpToNatOptions::default())
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl ExpToNat for GammaEP {
    fn initial_search_parameters(&self) -> Result<Array2<f64>> {
        // Generalized method-of-moments start from s = ln(mean) - mean_log,
        // accurate to a few percent over the whole shape range.
        let rows = self.flat_len();
        let mut out = Array2::zeros((rows, 1));
        for (i, (&m, &ml)) in self.mean.iter().zip(self.mean_log.iter()).enumerate() {
            let s = (m.ln() - ml).max(1e-12);
            let alpha = (3.0 - s + ((s - 3.0) * (s - 3.0) + 24.0 * s).sqrt()) / (12.0 * s);
            out[(i, 0)] = alpha.max(1e-8).ln();
        }
        Ok(out)
    }

    fn search_to_natural(&self, search: &ArrayView2<'_, f64>) -> Result<GammaNP> {
        // The rate matching the target mean is implied by the shape.
        let mut negative_rate = Vec::with_capacity(self.flat_len());
        let mut shape_minus_one = Vec::with_capacity(self.flat_len());
        for (i, &m) in self.mean.iter().enumerate() {
            let alpha = search[(i, 0)].exp();
            negative_rate.push(-alpha / m);
            shape_minus_one.push(alpha - 1.0);
        }
        GammaNP::new(
            util::array_from_vec(&self.shape, negative_rate)?,
            util::array_from_vec(&self.shape, shape_minus_one)?,
        )
    }

    fn search_gradient(&self, search: &ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        // Mean matches by construction; only the mean-log residual remains.
        let mut out = Array2::zeros((self.flat_len(), 1));
        for (i, (&m, &ml)) in self.mean.iter().zip(self.mean_log.iter()).enumerate() {
            let alpha = search[(i, 0)].exp();
            out[(i, 0)] = digamma(alpha) - (alpha / m).ln() - ml;
        }
        Ok(out)
    }
}

impl Samplable for GammaNP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let draws: Vec<GammaDraw<f64>> = self
            .negative_rate
            .iter()
            .zip(self.shape_minus_one.iter())
            .map(|(&nr, &sm)| {
                GammaDraw::new(sm + 1.0, -1.0 / nr)
                    .map_err(|e| Error::Computation(e.to_string()))
            })
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
    fn test_log_pdf_matches_closed_form() {
        // Gamma(α = 2, β = 3): log pdf(x) = 2 ln 3 + ln x - 3x - ln Γ(2).
        let nat = GammaNP::new(scalar(-3.0), scalar(1.0)).unwrap();
        let x = scalar(0.9);
        let expected = 2.0 * 3.0_f64.ln() + 0.9_f64.ln() - 3.0 * 0.9;
        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_solver_roundtrip() {
        let nat = GammaNP::new(scalar(-0.4), scalar(4.5)).unwrap();
        let back = nat.to_exp().unwrap().to_nat().unwrap();
        assert_relative_eq!(back.negative_rate()[[0]], -0.4, max_relative = 1e-6);
        assert_relative_eq!(back.shape_minus_one()[[0]], 4.5, max_relative = 1e-6);
    }

    #[test]
    fn test_solver_handles_small_shapes() {
        let nat = GammaNP::new(scalar(-5.0), scalar(-0.8)).unwrap();
        let back = nat.to_exp().unwrap().to_nat().unwrap();
        assert_relative_eq!(back.shape_minus_one()[[0]], -0.8, max_relative = 1e-5);
    }

    #[test]
    fn test_batched_solver() {
        let negative_rate =
            ArrayD::from_shape_vec(IxDyn(&[3]), vec![-1.0, -2.0, -0.25]).unwrap();
        let shape_minus_one = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0, 3.0, 9.0]).unwrap();
        let nat = GammaNP::new(negative_rate.clone(), shape_minus_one.clone()).unwrap();
        let back = nat.to_exp().unwrap().to_nat().unwrap();
        for i in 0..3 {
            assert_relative_eq!(
                back.negative_rate()[[i]],
                negative_rate[[i]],
                max_relative = 1e-6
            );
        }
    }
}
