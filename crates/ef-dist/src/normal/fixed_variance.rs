//! Multivariate normal with a fixed, shared scalar variance.
//!
//! A curved family: the variance is a fixed field of both parametrizations,
//! so the only free parameter is the mean (the natural coordinate is
//! `μ/σ²`). The variance-dependent terms move into the carrier measure. The
//! conjugate prior on the mean is an isotropic normal; the generalized form
//! admits a per-dimension pseudo-observation count and yields a diagonal
//! normal.

use std::f64::consts::PI;

use ef_core::shape::{broadcast_apply, broadcast_to, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, HasConjugatePrior, HasGeneralizedConjugatePrior,
    Multidimensional, NaturalParametrization, Parametrization, Samplable,
};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal as NormalDraw};

use crate::normal::diagonal::DiagonalNormalNP;
use crate::normal::isotropic::IsotropicNormalNP;
use crate::util;

/// Natural parametrization of the fixed-variance normal distribution.
#[derive(Debug, Clone)]
pub struct FixedVarianceNormalNP {
    variance: ArrayD<f64>,
    mean_times_precision: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the fixed-variance normal distribution.
#[derive(Debug, Clone)]
pub struct FixedVarianceNormalEP {
    variance: ArrayD<f64>,
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

impl FixedVarianceNormalNP {
    /// Create from the fixed variance and the batched `μ/σ²` vectors.
    pub fn new(variance: ArrayD<f64>, mean_times_precision: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("variance", Support::scalar().fixed(), variance.shape()),
            ("mean_times_precision", Support::vector(), mean_times_precision.shape()),
        ])?;
        Ok(Self { variance, mean_times_precision, shape })
    }

    /// The fixed shared variance `σ²`.
    pub fn variance(&self) -> &ArrayD<f64> {
        &self.variance
    }

    /// The natural parameter `μ/σ²`.
    pub fn mean_times_precision(&self) -> &ArrayD<f64> {
        &self.mean_times_precision
    }
}

impl FixedVarianceNormalEP {
    /// Create from the fixed variance and the batched mean vectors.
    pub fn new(variance: ArrayD<f64>, mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("variance", Support::scalar().fixed(), variance.shape()),
            ("mean", Support::vector(), mean.shape()),
        ])?;
        Ok(Self { variance, mean, shape })
    }

    /// The fixed shared variance `σ²`.
    pub fn variance(&self) -> &ArrayD<f64> {
        &self.variance
    }

    /// The mean vector.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Multidimensional for FixedVarianceNormalNP {
    fn dimensions(&self) -> usize {
        self.mean_times_precision.shape()[self.mean_times_precision.ndim() - 1]
    }
}

impl Multidimensional for FixedVarianceNormalEP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Parametrization for FixedVarianceNormalNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("variance", Support::scalar().fixed(), &self.variance),
            Field::new("mean_times_precision", Support::vector(), &self.mean_times_precision),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for FixedVarianceNormalEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("variance", Support::scalar().fixed(), &self.variance),
            Field::new("mean", Support::vector(), &self.mean),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for FixedVarianceNormalNP {
    type Expectation = FixedVarianceNormalEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        // A(η) = σ²‖η‖²/2.
        let norm_sq = self.mean_times_precision.map_axis(
            Axis(self.mean_times_precision.ndim() - 1),
            |lane| lane.iter().map(|v| v * v).sum(),
        );
        broadcast_apply(&norm_sq.view(), &self.variance.view(), |n, v| 0.5 * v * n)
    }

    fn to_exp(&self) -> Result<FixedVarianceNormalEP> {
        let last = Axis(self.mean_times_precision.ndim() - 1);
        let variance_col = self.variance.clone().insert_axis(last);
        let mean = broadcast_apply(
            &self.mean_times_precision.view(),
            &variance_col.view(),
            |e, v| e * v,
        )?;
        FixedVarianceNormalEP::new(self.variance.clone(), mean)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        let d = self.dimensions() as f64;
        let norm_sq =
            x.map_axis(Axis(x.ndim() - 1), |lane| lane.iter().map(|v| v * v).sum::<f64>());
        broadcast_apply(&norm_sq.view(), &self.variance.view(), move |n, v| {
            -n / (2.0 * v) - 0.5 * d * (2.0 * PI * v).ln()
        })
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<FixedVarianceNormalEP> {
        let variance = broadcast_to(&self.variance.view(), &x.shape()[..x.ndim() - 1])?;
        FixedVarianceNormalEP::new(variance, x.to_owned())
    }
}

impl ExpectationParametrization for FixedVarianceNormalEP {
    type Natural = FixedVarianceNormalNP;

    fn to_nat(&self) -> Result<FixedVarianceNormalNP> {
        let last = Axis(self.mean.ndim() - 1);
        let variance_col = self.variance.clone().insert_axis(last);
        let mean_times_precision =
            broadcast_apply(&self.mean.view(), &variance_col.view(), |m, v| m / v)?;
        FixedVarianceNormalNP::new(self.variance.clone(), mean_times_precision)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        let d = self.dimensions() as f64;
        let norm_sq = self
            .mean
            .map_axis(Axis(self.mean.ndim() - 1), |lane| lane.iter().map(|v| v * v).sum());
        broadcast_apply(&norm_sq.view(), &self.variance.view(), move |n, v| {
            -0.5 * (n / v + d + d * (2.0 * PI * v).ln())
        })
    }
}

impl HasConjugatePrior for FixedVarianceNormalEP {
    type Prior = IsotropicNormalNP;

    fn conjugate_prior_distribution(&self, n: &ArrayViewD<'_, f64>) -> Result<IsotropicNormalNP> {
        let last = Axis(self.mean.ndim() - 1);
        let scale = broadcast_apply(n, &self.variance.view(), |n, v| n / v)?;
        let scale_col = scale.clone().insert_axis(last);
        let mean_times_precision =
            broadcast_apply(&self.mean.view(), &scale_col.view(), |m, s| m * s)?;
        let negative_half_precision = scale.mapv(|s| -0.5 * s);
        IsotropicNormalNP::new(mean_times_precision, negative_half_precision)
    }

    fn conjugate_prior_observation(&self) -> Result<ArrayD<f64>> {
        Ok(self.mean.clone())
    }
}

impl HasGeneralizedConjugatePrior for FixedVarianceNormalEP {
    type GeneralizedPrior = DiagonalNormalNP;

    fn generalized_conjugate_prior_distribution(
        &self,
        n: &ArrayViewD<'_, f64>,
    ) -> Result<DiagonalNormalNP> {
        let last = Axis(self.mean.ndim() - 1);
        let variance_col = self.variance.clone().insert_axis(last);
        let scale = broadcast_apply(n, &variance_col.view(), |n, v| n / v)?;
        let mean_times_precision =
            broadcast_apply(&self.mean.view(), &scale.view(), |m, s| m * s)?;
        let negative_half_precision = scale.mapv(|s| -0.5 * s);
        DiagonalNormalNP::new(mean_times_precision, negative_half_precision)
    }
}

impl Samplable for FixedVarianceNormalEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let dims = self.dimensions();
        let sigma: Vec<f64> = self.variance.iter().map(|v| v.sqrt()).collect();
        let means: Vec<f64> = self.mean.iter().copied().collect();
        let mut draws = Vec::with_capacity(means.len());
        for (b, lane) in means.chunks(dims).enumerate() {
            for &m in lane {
                draws.push(
                    NormalDraw::new(m, sigma[b])
                        .map_err(|e| Error::Computation(e.to_string()))?,
                );
            }
        }
        let repeats: usize = sample_shape.iter().product();
        let mut values = Vec::with_capacity(repeats * draws.len());
        for _ in 0..repeats {
            for d in &draws {
                values.push(d.sample(rng));
            }
        }
        util::sample_output(sample_shape, &self.shape, &[dims], values)
    }
}
