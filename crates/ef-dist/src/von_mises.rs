//! Von Mises-Fisher distribution on the unit circle.
//!
//! Natural parameter: the mean direction scaled by the concentration,
//! `η = κ μ`. Expectation parameter: the mean resultant vector, whose length
//! is the Bessel ratio `I_1(κ)/I_0(κ)`. Inverting that ratio has no closed
//! form and runs through the Newton solver over a softplus-reparametrized
//! concentration. Only the two-dimensional (circular) case is supported;
//! higher dimensions need Bessel functions of general real order.

use std::f64::consts::PI;

use ef_core::math::{bessel_i0e, bessel_i1_i0_ratio, inverse_softplus, norm_last_axis, softplus};
use ef_core::shape::{broadcast_apply, common_batch_shape};
use ef_core::{Error, Result, Support};
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, Field, Multidimensional,
    NaturalParametrization, Parametrization,
};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};

use crate::util;

/// Natural parametrization of the von Mises-Fisher distribution.
#[derive(Debug, Clone)]
pub struct VonMisesFisherNP {
    mean_times_concentration: ArrayD<f64>,
    shape: Vec<usize>,
}

/// Expectation parametrization of the von Mises-Fisher distribution.
#[derive(Debug, Clone)]
pub struct VonMisesFisherEP {
    mean: ArrayD<f64>,
    shape: Vec<usize>,
}

fn ensure_planar(dims: usize) -> Result<()> {
    if dims != 2 {
        return Err(Error::NotImplemented(format!(
            "von Mises-Fisher in {} dimensions (only the circular case is supported)",
            dims
        )));
    }
    Ok(())
}

impl VonMisesFisherNP {
    /// Create from the batched `κ μ` vectors.
    pub fn new(mean_times_concentration: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[(
            "mean_times_concentration",
            Support::vector(),
            mean_times_concentration.shape(),
        )])?;
        Ok(Self { mean_times_concentration, shape })
    }

    /// The scaled mean direction `κ μ`.
    pub fn mean_times_concentration(&self) -> &ArrayD<f64> {
        &self.mean_times_concentration
    }

    /// The concentration `κ = ‖η‖` per batch element.
    pub fn concentration(&self) -> ArrayD<f64> {
        norm_last_axis(&self.mean_times_concentration.view())
    }
}

impl VonMisesFisherEP {
    /// Create from the batched mean resultant vectors (length below one).
    pub fn new(mean: ArrayD<f64>) -> Result<Self> {
        let shape = common_batch_shape(&[("mean", Support::vector(), mean.shape())])?;
        Ok(Self { mean, shape })
    }

    /// The mean resultant vector `E[x]`.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }
}

impl Multidimensional for VonMisesFisherNP {
    fn dimensions(&self) -> usize {
        self.mean_times_concentration.shape()[self.mean_times_concentration.ndim() - 1]
    }
}

impl Multidimensional for VonMisesFisherEP {
    fn dimensions(&self) -> usize {
        self.mean.shape()[self.mean.ndim() - 1]
    }
}

impl Parametrization for VonMisesFisherNP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new(
            "mean_times_concentration",
            Support::vector(),
            &self.mean_times_concentration,
        )]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Parametrization for VonMisesFisherEP {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::new("mean", Support::vector(), &self.mean)]
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl NaturalParametrization for VonMisesFisherNP {
    type Expectation = VonMisesFisherEP;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        ensure_planar(self.dimensions())?;
        // A(η) = ln(2π I_0(κ)); the scaled Bessel form keeps it finite for
        // large κ.
        Ok(self.concentration().mapv(|k| (2.0 * PI).ln() + bessel_i0e(k).ln() + k))
    }

    fn to_exp(&self) -> Result<VonMisesFisherEP> {
        ensure_planar(self.dimensions())?;
        let last = Axis(self.mean_times_concentration.ndim() - 1);
        let scale = self
            .concentration()
            .mapv(|k| if k == 0.0 { 0.0 } else { bessel_i1_i0_ratio(k) / k })
            .insert_axis(last);
        let mean = broadcast_apply(
            &self.mean_times_concentration.view(),
            &scale.view(),
            |eta, s| eta * s,
        )?;
        VonMisesFisherEP::new(mean)
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&x.shape()[..x.ndim() - 1])))
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<VonMisesFisherEP> {
        // Observations must be unit vectors.
        VonMisesFisherEP::new(x.to_owned())
    }
}

impl ExpectationParametrization for VonMisesFisherEP {
    type Natural = VonMisesFisherNP;

    fn to_nat(&self) -> Result<VonMisesFisherNP> {
        ensure_planar(self.dimensions())?;
        self.solve_to_nat(&ExpToNatOptions::default())
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.shape)))
    }
}

impl ExpToNat for VonMisesFisherEP {
    fn initial_search_parameters(&self) -> Result<Array2<f64>> {
        // Banerjee's approximation κ ≈ r(d - r²)/(1 - r²) for the resultant
        // length r.
        let d = self.dimensions() as f64;
        let lengths = norm_last_axis(&self.mean.view());
        let rows = self.flat_len();
        let mut out = Array2::zeros((rows, 1));
        for (i, &r) in lengths.iter().enumerate() {
            let kappa = (r * (d - r * r) / (1.0 - r * r)).max(1e-6);
            out[(i, 0)] = inverse_softplus(kappa);
        }
        Ok(out)
    }

    fn search_to_natural(&self, search: &ArrayView2<'_, f64>) -> Result<VonMisesFisherNP> {
        let dims = self.dimensions();
        let lengths: Vec<f64> = norm_last_axis(&self.mean.view()).iter().copied().collect();
        let mean_flat: Vec<f64> = self.mean.iter().copied().collect();
        let mut values = Vec::with_capacity(mean_flat.len());
        for (i, lane) in mean_flat.chunks(dims).enumerate() {
            let kappa = softplus(search[(i, 0)]);
            let r = lengths[i];
            if r == 0.0 {
                values.extend(std::iter::repeat(0.0).take(dims));
            } else {
                values.extend(lane.iter().map(|&m| kappa * m / r));
            }
        }
        let mut shape = self.shape.clone();
        shape.push(dims);
        VonMisesFisherNP::new(util::array_from_vec(&shape, values)?)
    }

    fn search_gradient(&self, search: &ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        // The direction matches by construction; only the resultant length
        // residual remains.
        let lengths = norm_last_axis(&self.mean.view());
        let mut out = Array2::zeros((self.flat_len(), 1));
        for (i, &r) in lengths.iter().enumerate() {
            let kappa = softplus(search[(i, 0)]);
            out[(i, 0)] = bessel_i1_i0_ratio(kappa) - r;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn planar(x: f64, y: f64) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![x, y]).unwrap()
    }

    #[test]
    fn test_uniform_circle_has_zero_mean() {
        let nat = VonMisesFisherNP::new(planar(0.0, 0.0)).unwrap();
        let ep = nat.to_exp().unwrap();
        assert_relative_eq!(ep.mean()[[0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(ep.mean()[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            nat.log_normalizer().unwrap()[[0]],
            (2.0 * PI).ln(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_solver_roundtrip() {
        let nat = VonMisesFisherNP::new(planar(1.5, -0.8)).unwrap();
        let back = nat.to_exp().unwrap().to_nat().unwrap();
        assert_relative_eq!(
            back.mean_times_concentration()[[0, 0]],
            1.5,
            max_relative = 1e-4
        );
        assert_relative_eq!(
            back.mean_times_concentration()[[0, 1]],
            -0.8,
            max_relative = 1e-4
        );
    }

    #[test]
    fn test_higher_dimensions_are_not_implemented() {
        let nat =
            VonMisesFisherNP::new(ArrayD::zeros(IxDyn(&[1, 3]))).unwrap();
        assert!(matches!(nat.log_normalizer(), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn test_log_pdf_concentrates_around_mean_direction() {
        let nat = VonMisesFisherNP::new(planar(2.0, 0.0)).unwrap();
        let aligned = planar(1.0, 0.0);
        let opposed = planar(-1.0, 0.0);
        let lp_aligned = nat.log_pdf(&aligned.view()).unwrap()[[0]];
        let lp_opposed = nat.log_pdf(&opposed.view()).unwrap()[[0]];
        // log density gap between the mode and the antimode is 2κ.
        assert_relative_eq!(lp_aligned - lp_opposed, 4.0, epsilon = 1e-10);
    }
}
