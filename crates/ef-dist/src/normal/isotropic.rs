//! Isotropic multivariate normal: a shared scalar variance across all
//! dimensions.
//!
//! Natural parameters: `(μ/σ², -1/(2σ²))` with a vector first component.
//! Expectation parameters: the mean vector and the total second moment
//! `E[‖x‖²]`.

use std::f64::consts::PI;

use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, Multidimensional, NaturalParametrization, Parametrization,
    Samplable,
};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal as NormalDraw};

use crate::util;

/// Natural parametrization of the isotropic normal distribution.
#[derive(Debug, Clone)]
pub struct IsotropicNormalNP {
    mean_times_precision: ArrayD<f64>,
    negative_half_precision: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the isotropic normal distribution.
#[derive(Debug, Clone)]
pub struct IsotropicNormalEP {
    mean: ArrayD<f64>,
    total_second_moment: ArrayD<f64>,
    shape: Vec<usize>,
}

impl IsotropicNormalNP {
    /// Create from the batched natural parameters.
    pub fn new(
        mean_times_precision: ArrayD<f64>,
        negative_half_precision: ArrayD<f64>,
    ) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean_times_precision", Support::vector(), mean_times_precision.shape()),
            ("negative_half_precision", Support::scalar(), negative_half_precision.shape()),
        ])?;
        Ok(Self { mean_times_precision, negative_half_precision, shape })
    }

    /// The first natural parameter `μ/σ²`.
    pub fn mean_times_precision(&self) -> &ArrayD<f64> {
        &self.mean_times_precision
    }

    /// The second natural parameter `-1/(2σ²)`.
    pub fn negative_half_precision(&self) -> &ArrayD<f64> {
        &self.negative_half_precision
    }
}

impl IsotropicNormalEP {
    /// Create from the batched mean and total second moment.
    pub fn new(mean: ArrayD<f64>, total_second_moment: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::vector(), mean.shape()),
            ("total_second_moment", Support::scalar(), total_second_moment.shape()),
        ])?;
        Ok(Self { mean, total_second_moment, shape })
    }

    /// The mean vector.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The total second moment `E[‖x‖²]`.
    pub fn total_second_moment(&self) -> &ArrayD<f64> {
        &self.total_second_moment
    }

    /// The shared per-dimension variance.
    pub fn variance(&self) -> Result<ArrayD<f64>> {
        let d = self.dimensions() as f64;
        let norm_sq = self
            .mean
            .map_axis(Axis(self.mean.ndim() - 1), |lane| lane.iter().map(|v| v * v).sum());
        broadcast_apply(&self.total_second_moment.view(), &norm_sq.view(), move |tsm, n| {
            (tsm - n) / d
        })
    }
}

impl Multidimensional for IsotropicNormalNP {
    fn dimensions(&self) -> usize {
        self.mean_times_precision.shape()[self.mean_times_precision.ndim() - 1]
    }
}

impl Multidimensional for IsotropicNormalEP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Parametrization for IsotropicNormalNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean_times_precision", Support::vector(), &self.mean_times_precision),
            Field::new(
                "negative_half_precision",
                Support::scalar(),
                &self.negative_half_precision,
            ),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for IsotropicNormalEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::vector(), &self.mean),
            Field::new("total_second_moment", Support::scalar(), &self.total_second_moment),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for IsotropicNormalNP {
    type Expectation = IsotropicNormalEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let d = self.dimensions() as f64;
        let norm_sq = self.mean_times_precision.map_axis(
            Axis(self.mean_times_precision.ndim() - 1),
            |lane| lane.iter().map(|v| v * v).sum(),
        );
        broadcast_apply(
            &norm_sq.view(),
            &self.negative_half_precision.view(),
            move |n, e2| -n / (4.0 * e2) + 0.5 * d * (-PI / e2).ln(),
        )
    }

    fn to_exp(&self) -> Result<IsotropicNormalEP> {
        let last = Axis(self.mean_times_precision.ndim() - 1);
        let d = self.dimensions() as f64;
        let e2 = self.negative_half_precision.clone().insert_axis(last);
        let mean = broadcast_apply(&self.mean_times_precision.view(), &e2.view(), |e1, e2| {
            -e1 / (2.0 * e2)
        })?;
        let norm_sq =
            mean.map_axis(Axis(mean.ndim() - 1), |lane| lane.iter().map(|v| v * v).sum());
        let total_second_moment = broadcast_apply(
            &norm_sq.view(),
            &self.negative_half_precision.view(),
            move |n, e2| n - d / (2.0 * e2),
        )?;
        IsotropicNormalEP::new(mean, total_second_moment)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<IsotropicNormalEP> {
        let total_second_moment =
            x.map_axis(Axis(x.ndim() - 1), |lane| lane.iter().map(|v| v * v).sum());
        IsotropicNormalEP::new(x.to_owned(), total_second_moment)
    }
}

impl ExpectationParametrization for IsotropicNormalEP {
    type Natural = IsotropicNormalNP;

    fn to_nat(&self) -> Result<IsotropicNormalNP> {
        let last = Axis(self.mean.ndim() - 1);
        let variance = self.variance()?;
        let precision_col = variance.mapv(|v| 1.0 / v).insert_axis(last);
        let mean_times_precision =
            broadcast_apply(&self.mean.view(), &precision_col.view(), |m, p| m * p)?;
        let negative_half_precision = variance.mapv(|v| -0.5 / v);
        IsotropicNormalNP::new(mean_times_precision, negative_half_precision)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl Samplable for IsotropicNormalEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let dims = self.dimensions();
        let sigma: Vec<f64> = self.variance()?.iter().map(|v| v.sqrt()).collect();
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
