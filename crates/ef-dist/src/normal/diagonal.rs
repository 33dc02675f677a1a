//! Diagonal-covariance multivariate normal: an independent variance per
//! dimension, all fields vectors, all conversions elementwise.

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

/// Natural parametrization of the diagonal normal distribution.
#[derive(Debug, Clone)]
pub struct DiagonalNormalNP {
    mean_times_precision: ArrayD<f64>,
    negative_half_precision: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the diagonal normal distribution.
#[derive(Debug, Clone)]
pub struct DiagonalNormalEP {
    mean: ArrayD<f64>,
    second_moment: ArrayD<f64>,
    shape: Vec<usize>,
}

impl DiagonalNormalNP {
    /// Create from the batched per-dimension natural parameters.
    pub fn new(
        mean_times_precision: ArrayD<f64>,
        negative_half_precision: ArrayD<f64>,
    ) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean_times_precision", Support::vector(), mean_times_precision.shape()),
            ("negative_half_precision", Support::vector(), negative_half_precision.shape()),
        ])?;
        Ok(Self { mean_times_precision, negative_half_precision, shape })
    }

    /// The per-dimension `μ_i/σ_i²`.
    pub fn mean_times_precision(&self) -> &ArrayD<f64> {
        &self.mean_times_precision
    }

    /// The per-dimension `-1/(2σ_i²)`.
    pub fn negative_half_precision(&self) -> &ArrayD<f64> {
        &self.negative_half_precision
    }
}

impl DiagonalNormalEP {
    /// Create from the batched per-dimension first two moments.
    pub fn new(mean: ArrayD<f64>, second_moment: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::vector(), mean.shape()),
            ("second_moment", Support::vector(), second_moment.shape()),
        ])?;
        Ok(Self { mean, second_moment, shape })
    }

    /// The mean vector.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The per-dimension second moment `E[x_i²]`.
    pub fn second_moment(&self) -> &ArrayD<f64> {
        &self.second_moment
    }
}

impl Multidimensional for DiagonalNormalNP {
    fn dimensions(&self) -> usize {
        self.mean_times_precision.shape()[self.mean_times_precision.ndim() - 1]
    }
}

impl Multidimensional for DiagonalNormalEP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Parametrization for DiagonalNormalNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean_times_precision", Support::vector(), &self.mean_times_precision),
            Field::new(
                "negative_half_precision",
                Support::vector(),
                &self.negative_half_precision,
            ),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for DiagonalNormalEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::vector(), &self.mean),
            Field::new("second_moment", Support::vector(), &self.second_moment),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for DiagonalNormalNP {
    type Expectation = DiagonalNormalEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        let per_dim = broadcast_apply(
            &self.mean_times_precision.view(),
            &self.negative_half_precision.view(),
            |e1, e2| -e1 * e1 / (4.0 * e2) + 0.5 * (-PI / e2).ln(),
        )?;
        Ok(per_dim.sum_axis(Axis(per_dim.ndim() - 1)))
    }

    fn to_exp(&self) -> Result<DiagonalNormalEP> {
        let mean = broadcast_apply(
            &self.mean_times_precision.view(),
            &self.negative_half_precision.view(),
            |e1, e2| -e1 / (2.0 * e2),
        )?;
        let second_moment = broadcast_apply(
            &self.mean_times_precision.view(),
            &self.negative_half_precision.view(),
            |e1, e2| {
                let m = -e1 / (2.0 * e2);
                m * m - 1.0 / (2.0 * e2)
            },
        )?;
        DiagonalNormalEP::new(mean, second_moment)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<DiagonalNormalEP> {
        DiagonalNormalEP::new(x.to_owned(), x.mapv(|v| v * v))
    }
}

impl ExpectationParametrization for DiagonalNormalEP {
    type Natural = DiagonalNormalNP;

    fn to_nat(&self) -> Result<DiagonalNormalNP> {
        let mean_times_precision = broadcast_apply(
            &self.mean.view(),
            &self.second_moment.view(),
            |m, sm| m / (sm - m * m),
        )?;
        let negative_half_precision = broadcast_apply(
            &self.mean.view(),
            &self.second_moment.view(),
            |m, sm| -0.5 / (sm - m * m),
        )?;
        DiagonalNormalNP::new(mean_times_precision, negative_half_precision)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl Samplable for DiagonalNormalEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let dims = self.dimensions();
        let mut draws = Vec::with_capacity(self.mean.len());
        for (&m, &sm) in self.mean.iter().zip(self.second_moment.iter()) {
            let sigma = (sm - m * m).sqrt();
            draws.push(
                NormalDraw::new(m, sigma).map_err(|e| Error::Computation(e.to_string()))?,
            );
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip() {
        let mean = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.0, -0.5]).unwrap();
        let second = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![3.0, 0.75]).unwrap();
        let ep = DiagonalNormalEP::new(mean, second).unwrap();
        let back = ep.to_nat().unwrap().to_exp().unwrap();
        assert_relative_eq!(back.mean()[[0, 0]], 1.0, epsilon = 1e-10);
        assert_relative_eq!(back.second_moment()[[0, 1]], 0.75, epsilon = 1e-10);
    }

    #[test]
    fn test_log_pdf_is_sum_of_univariate_terms() {
        use crate::normal::univariate::NormalVP;

        let mean = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.5, -1.0]).unwrap();
        let second = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.25, 3.0]).unwrap();
        let nat = DiagonalNormalEP::new(mean, second).unwrap().to_nat().unwrap();
        let x = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.2, 0.9]).unwrap();

        let scalar = |v: f64| ArrayD::from_elem(IxDyn(&[1]), v);
        let u0 = NormalVP::new(scalar(0.5), scalar(1.0)).unwrap().to_exp().unwrap().to_nat().unwrap();
        let u1 = NormalVP::new(scalar(-1.0), scalar(2.0)).unwrap().to_exp().unwrap().to_nat().unwrap();
        let expected = u0.log_pdf(&scalar(0.2).view()).unwrap()[[0]]
            + u1.log_pdf(&scalar(0.9).view()).unwrap()[[0]];

        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], expected, epsilon = 1e-10);
    }

    #[test]
    fn test_sampled_moments_match_parameters() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mean = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.0, -2.0]).unwrap();
        let second = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.25, 6.0]).unwrap();
        let ep = DiagonalNormalEP::new(mean, second).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let draws = ep.sample(&mut rng, &[40_000]).unwrap();
        assert_eq!(draws.shape(), &[40_000, 1, 2]);

        let stats = ep.to_nat().unwrap().sufficient_statistics(&draws.view()).unwrap();
        let mean_hat = stats.mean().mean_axis(Axis(0)).unwrap();
        let second_hat = stats.second_moment().mean_axis(Axis(0)).unwrap();
        assert_relative_eq!(mean_hat[[0, 0]], 1.0, epsilon = 0.015);
        assert_relative_eq!(mean_hat[[0, 1]], -2.0, epsilon = 0.03);
        assert_relative_eq!(second_hat[[0, 0]], 1.25, epsilon = 0.03);
        assert_relative_eq!(second_hat[[0, 1]], 6.0, epsilon = 0.15);
    }
}
