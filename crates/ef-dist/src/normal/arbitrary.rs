//! Multivariate normal with arbitrary covariance.
//!
//! Natural parameters: `(Σ⁻¹μ, -Σ⁻¹/2)` with a full-storage symmetric matrix
//! second component. Expectation parameters: the mean and the second-moment
//! matrix `E[x xᵀ]`. Conversions factor each batch element's matrix with a
//! Cholesky decomposition; matrices that are not positive definite surface as
//! computation errors. A covariance parametrization `(μ, Σ)` is provided as
//! the human-facing coordinate system.

use std::f64::consts::PI;

use ef_core::shape::common_batch_shape;
use ef_core::{Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, Multidimensional, NaturalParametrization, Parametrization,
    Samplable,
};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::normal::linalg;
use crate::util;

/// Natural parametrization of the multivariate normal distribution.
#[derive(Debug, Clone)]
pub struct MultivariateNormalNP {
    mean_times_precision: ArrayD<f64>,
    negative_half_precision: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the multivariate normal distribution.
#[derive(Debug, Clone)]
pub struct MultivariateNormalEP {
    mean: ArrayD<f64>,
    second_moment: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Covariance parametrization of the multivariate normal distribution.
#[derive(Debug, Clone)]
pub struct MultivariateNormalVP {
    mean: ArrayD<f64>,
    covariance: ArrayD<f64>,
    shape: Vec<usize>,
}

impl MultivariateNormalNP {
    /// Create from the batched natural parameters.
    pub fn new(
        mean_times_precision: ArrayD<f64>,
        negative_half_precision: ArrayD<f64>,
    ) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean_times_precision", Support::vector(), mean_times_precision.shape()),
            (
                "negative_half_precision",
                Support::symmetric_matrix(),
                negative_half_precision.shape(),
            ),
        ])?;
        Ok(Self { mean_times_precision, negative_half_precision, shape })
    }

    /// The first natural parameter `Σ⁻¹μ`.
    pub fn mean_times_precision(&self) -> &ArrayD<f64> {
        &self.mean_times_precision
    }

    /// The second natural parameter `-Σ⁻¹/2` (full storage).
    pub fn negative_half_precision(&self) -> &ArrayD<f64> {
        &self.negative_half_precision
    }
}

impl MultivariateNormalEP {
    /// Create from the batched mean and second-moment matrix.
    pub fn new(mean: ArrayD<f64>, second_moment: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::vector(), mean.shape()),
            ("second_moment", Support::symmetric_matrix(), second_moment.shape()),
        ])?;
        Ok(Self { mean, second_moment, shape })
    }

    /// The mean vector.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The second-moment matrix `E[x xᵀ]`.
    pub fn second_moment(&self) -> &ArrayD<f64> {
        &self.second_moment
    }

    /// Convert to the covariance parametrization.
    pub fn to_covariance_parametrization(&self) -> Result<MultivariateNormalVP> {
        let d = self.dimensions();
        let mus = linalg::vectors(&self.mean.view(), d);
        let seconds = linalg::matrices(&self.second_moment.view(), d);
        let covariances: Vec<_> = mus
            .iter()
            .zip(&seconds)
            .map(|(mu, sm)| sm - mu * mu.transpose())
            .collect();
        MultivariateNormalVP::new(
            self.mean.clone(),
            linalg::from_matrices(&covariances, &self.shape, d)?,
        )
    }
}

impl MultivariateNormalVP {
    /// Create from the batched mean and covariance.
    pub fn new(mean: ArrayD<f64>, covariance: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::vector(), mean.shape()),
            ("covariance", Support::symmetric_matrix(), covariance.shape()),
        ])?;
        Ok(Self { mean, covariance, shape })
    }

    /// The mean vector.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The covariance matrix.
    pub fn covariance(&self) -> &ArrayD<f64> {
        &self.covariance
    }

    /// Convert to the expectation parametrization.
    pub fn to_exp(&self) -> Result<MultivariateNormalEP> {
        let d = self.dimensions();
        let mus = linalg::vectors(&self.mean.view(), d);
        let covs = linalg::matrices(&self.covariance.view(), d);
        let seconds: Vec<_> =
            mus.iter().zip(&covs).map(|(mu, cov)| cov + mu * mu.transpose()).collect();
        MultivariateNormalEP::new(
            self.mean.clone(),
            linalg::from_matrices(&seconds, &self.shape, d)?,
        )
    }
}

impl Multidimensional for MultivariateNormalNP {
    fn dimensions(&self) -> usize {
        self.mean_times_precision.shape()[self.mean_times_precision.ndim() - 1]
    }
}

impl Multidimensional for MultivariateNormalEP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Multidimensional for MultivariateNormalVP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Parametrization for MultivariateNormalNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean_times_precision", Support::vector(), &self.mean_times_precision),
            Field::new(
                "negative_half_precision",
                Support::symmetric_matrix(),
                &self.negative_half_precision,
            ),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for MultivariateNormalEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::vector(), &self.mean),
            Field::new("second_moment", Support::symmetric_matrix(), &self.second_moment),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for MultivariateNormalVP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::vector(), &self.mean),
            Field::new("covariance", Support::symmetric_matrix(), &self.covariance),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for MultivariateNormalNP {
    type Expectation = MultivariateNormalEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let d = self.dimensions();
        let etas = linalg::vectors(&self.mean_times_precision.view(), d);
        let halves = linalg::matrices(&self.negative_half_precision.view(), d);
        let mut values = Vec::with_capacity(etas.len());
        for (eta, half) in etas.iter().zip(&halves) {
            let precision = half.map(|v| -2.0 * v);
            let chol = linalg::spd_cholesky(precision, "multivariate normal log-normalizer")?;
            let solved = chol.solve(eta);
            values.push(
                0.5 * eta.dot(&solved) - 0.5 * linalg::logdet(&chol)
                    + 0.5 * d as f64 * (2.0 * PI).ln(),
            );
        }
        linalg::from_scalars(values, &self.shape)
    }

    fn to_exp(&self) -> Result<MultivariateNormalEP> {
        let d = self.dimensions();
        let etas = linalg::vectors(&self.mean_times_precision.view(), d);
        let halves = linalg::matrices(&self.negative_half_precision.view(), d);
        let mut mus = Vec::with_capacity(etas.len());
        let mut seconds = Vec::with_capacity(etas.len());
        for (eta, half) in etas.iter().zip(&halves) {
            let precision = half.map(|v| -2.0 * v);
            let chol = linalg::spd_cholesky(precision, "multivariate normal conversion")?;
            let sigma = chol.inverse();
            let mu = chol.solve(eta);
            seconds.push(&sigma + &mu * mu.transpose());
            mus.push(mu);
        }
        MultivariateNormalEP::new(
            linalg::from_vectors(&mus, &self.shape, d)?,
            linalg::from_matrices(&seconds, &self.shape, d)?,
        )
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<MultivariateNormalEP> {
        MultivariateNormalEP::new(x.to_owned(), linalg::outer_product(x)?)
    }
}

impl ExpectationParametrization for MultivariateNormalEP {
    type Natural = MultivariateNormalNP;

    fn to_nat(&self) -> Result<MultivariateNormalNP> {
        let d = self.dimensions();
        let mus = linalg::vectors(&self.mean.view(), d);
        let seconds = linalg::matrices(&self.second_moment.view(), d);
        let mut etas = Vec::with_capacity(mus.len());
        let mut halves = Vec::with_capacity(mus.len());
        for (mu, sm) in mus.iter().zip(&seconds) {
            let covariance = sm - mu * mu.transpose();
            let chol = linalg::spd_cholesky(covariance, "multivariate normal conversion")?;
            let precision = chol.inverse();
            etas.push(&precision * mu);
            halves.push(precision.map(|v| -0.5 * v));
        }
        MultivariateNormalNP::new(
            linalg::from_vectors(&etas, &self.shape, d)?,
            linalg::from_matrices(&halves, &self.shape, d)?,
        )
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl Samplable for MultivariateNormalVP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let d = self.dimensions();
        let mus = linalg::vectors(&self.mean.view(), d);
        let factors = linalg::matrices(&self.covariance.view(), d)
            .into_iter()
            .map(|cov| {
                Ok(linalg::spd_cholesky(cov, "multivariate normal sampling")?.l())
            })
            .collect::<Result<Vec<_>>>()?;
        let repeats: usize = sample_shape.iter().product();
        let mut values = Vec::with_capacity(repeats * mus.len() * d);
        for _ in 0..repeats {
            for (mu, l) in mus.iter().zip(&factors) {
                let z = nalgebra::DVector::from_fn(d, |_, _| {
                    StandardNormal.sample(rng)
                });
                let x = mu + l * z;
                values.extend(x.iter().copied());
            }
        }
        util::sample_output(sample_shape, &self.shape, &[d], values)
    }
}
