//! Univariate normal distribution.
//!
//! Natural parameters: `(μ/σ², -1/(2σ²))`. Expectation parameters: the first
//! two moments `(E[x], E[x²])`. A variance parametrization `(μ, σ²)` is also
//! provided as the human-facing coordinate system.

use std::f64::consts::PI;

use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpectationParametrization, Field, NaturalParametrization, Parametrization, Samplable,
};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal as NormalDraw};

use crate::util;

/// Natural parametrization of the univariate normal distribution.
#[derive(Debug, Clone)]
pub struct NormalNP {
    mean_times_precision: ArrayD<f64>,
    negative_half_precision: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the univariate normal distribution.
#[derive(Debug, Clone)]
pub struct NormalEP {
    mean: ArrayD<f64>,
    second_moment: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Variance parametrization of the univariate normal distribution.
#[derive(Debug, Clone)]
pub struct NormalVP {
    mean: ArrayD<f64>,
    variance: ArrayD<f64>,
    shape: Vec<usize>,
}

impl NormalNP {
    /// Create from the batched natural parameters.
    pub fn new(mean_times_precision: ArrayD<f64>, negative_half_precision: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean_times_precision", Support::scalar(), mean_times_precision.shape()),
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

impl NormalEP {
    /// Create from the batched first two moments.
    pub fn new(mean: ArrayD<f64>, second_moment: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::scalar(), mean.shape()),
            ("second_moment", Support::scalar(), second_moment.shape()),
        ])?;
        Ok(Self { mean, second_moment, shape })
    }

    /// The mean `E[x]`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The second moment `E[x²]`.
    pub fn second_moment(&self) -> &ArrayD<f64> {
        &self.second_moment
    }

    /// The variance `E[x²] - E[x]²`.
    pub fn variance(&self) -> Result<ArrayD<f64>> {
        broadcast_apply(&self.second_moment.view(), &self.mean.view(), |sm, m| sm - m * m)
    }

    /// Convert to the variance parametrization.
    pub fn to_variance_parametrization(&self) -> Result<NormalVP> {
        NormalVP::new(self.mean.clone(), self.variance()?)
    }
}

impl NormalVP {
    /// Create from the batched mean and variance.
    pub fn new(mean: ArrayD<f64>, variance: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[
            ("mean", Support::scalar(), mean.shape()),
            ("variance", Support::scalar(), variance.shape()),
        ])?;
        Ok(Self { mean, variance, shape })
    }

    /// The mean.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// The variance.
    pub fn variance(&self) -> &ArrayD<f64> {
        &self.variance
    }

    /// Convert to the expectation parametrization.
    pub fn to_exp(&self) -> Result<NormalEP> {
        let second_moment =
            broadcast_apply(&self.variance.view(), &self.mean.view(), |v, m| v + m * m)?;
        NormalEP::new(self.mean.clone(), second_moment)
    }
}

impl Parametrization for NormalNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean_times_precision", Support::scalar(), &self.mean_times_precision),
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

impl Parametrization for NormalEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::scalar(), &self.mean),
            Field::new("second_moment", Support::scalar(), &self.second_moment),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for NormalVP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("mean", Support::scalar(), &self.mean),
            Field::new("variance", Support::scalar(), &self.variance),
        ]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for NormalNP {
    type Expectation = NormalEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        broadcast_apply(
            &self.mean_times_precision.view(),
            &self.negative_half_precision.view(),
            |e1, e2| -e1 * e1 / (4.0 * e2) + 0.5 * (-PI / e2).ln(),
        )
    }

    fn to_exp(&self) -> Result<NormalEP> {
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
        NormalEP::new(mean, second_moment)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(x.shape())))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<NormalEP> {
        NormalEP::new(x.to_owned(), x.mapv(|v| v * v))
    }
}

impl ExpectationParametrization for NormalEP {
    type Natural = NormalNP;

    fn to_nat(&self) -> Result<NormalNP> {
        let variance = self.variance()?;
        let mean_times_precision =
            broadcast_apply(&self.mean.view(), &variance.view(), |m, v| m / v)?;
        let negative_half_precision = variance.mapv(|v| -0.5 / v);
        NormalNP::new(mean_times_precision, negative_half_precision)
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl Samplable for NormalEP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        self.to_variance_parametrization()?.sample(rng, sample_shape)
    }
}

impl Samplable for NormalVP {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>> {
        let draws: Vec<NormalDraw<f64>> = self
            .mean
            .iter()
            .zip(self.variance.iter())
            .map(|(&m, &v)| {
                NormalDraw::new(m, v.sqrt()).map_err(|e| Error::Computation(e.to_string()))
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

    fn standard() -> NormalNP {
        NormalVP::new(scalar(0.0), scalar(1.0)).unwrap().to_exp().unwrap().to_nat().unwrap()
    }

    #[test]
    fn test_standard_normal_log_pdf() {
        let nat = standard();
        let x = scalar(0.0);
        assert_relative_eq!(
            nat.log_pdf(&x.view()).unwrap()[[0]],
            -0.5 * (2.0 * PI).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_roundtrip_through_all_parametrizations() {
        let vp = NormalVP::new(scalar(1.5), scalar(0.7)).unwrap();
        let back = vp
            .to_exp()
            .unwrap()
            .to_nat()
            .unwrap()
            .to_exp()
            .unwrap()
            .to_variance_parametrization()
            .unwrap();
        assert_relative_eq!(back.mean()[[0]], 1.5, epsilon = 1e-12);
        assert_relative_eq!(back.variance()[[0]], 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_entropy_matches_closed_form() {
        let variance: f64 = 2.3;
        let ep = NormalVP::new(scalar(-4.0), scalar(variance)).unwrap().to_exp().unwrap();
        let expected = 0.5 * (2.0 * PI * std::f64::consts::E * variance).ln();
        assert_relative_eq!(ep.entropy().unwrap()[[0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_kl_divergence_between_unit_variance_normals() {
        // KL(N(μ, 1) ‖ N(0, 1)) = μ²/2.
        let p = NormalVP::new(scalar(2.0), scalar(1.0)).unwrap().to_exp().unwrap();
        let q = NormalVP::new(scalar(0.0), scalar(1.0)).unwrap().to_exp().unwrap().to_nat().unwrap();
        assert_relative_eq!(p.kl_divergence(&q).unwrap()[[0]], 2.0, epsilon = 1e-12);
    }
}
