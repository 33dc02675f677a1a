//! Chi distribution, derived from the chi-square by the square transform:
//! if `y` is chi-square with `k` degrees of freedom, `x = sqrt(y)` is chi.

use std::f64::consts::LN_2;

use ef_core::Result;
use ef_exp::{ObservationTransform, TransformedEP, TransformedNP};
use ndarray::{ArrayD, ArrayViewD};
use statrs::function::gamma::digamma;

use crate::chi_square::ChiSquareNP;

/// The observation transform `x -> x^2` from chi into chi-square.
#[derive(Debug, Clone)]
pub struct SquareTransform;

impl ObservationTransform<ChiSquareNP> for SquareTransform {
    fn sample_to_base_sample(x: &ArrayViewD<'_, f64>) -> ArrayD<f64> {
        x.mapv(|v| v * v)
    }

    fn log_jacobian(x: &ArrayViewD<'_, f64>) -> ArrayD<f64> {
        x.mapv(|v| (2.0 * v).ln())
    }

    fn expected_carrier_measure(base: &ChiSquareNP) -> Result<ArrayD<f64>> {
        // k(x) = -x^2/2 + ln(2x); E[x^2] = k and E[ln x] = (ψ(k/2) + ln 2)/2.
        Ok(base.half_dof_minus_one().mapv(|e| {
            let half_k = e + 1.0;
            -half_k + 0.5 * digamma(half_k) + 1.5 * LN_2
        }))
    }
}

/// Natural parametrization of the chi distribution.
pub type ChiNP = TransformedNP<ChiSquareNP, SquareTransform>;

/// Expectation parametrization of the chi distribution.
pub type ChiEP = TransformedEP<ChiSquareNP, SquareTransform>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ef_exp::{ExpectationParametrization, NaturalParametrization};
    use ndarray::{ArrayD, IxDyn};

    fn scalar(v: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[1]), v)
    }

    #[test]
    fn test_log_pdf_matches_closed_form() {
        // k = 2 (Rayleigh with σ = 1): log pdf(x) = ln x - x^2/2.
        let nat = ChiNP::new(ChiSquareNP::new(scalar(0.0)).unwrap());
        let x = scalar(1.3);
        let expected = 1.3_f64.ln() - 1.3 * 1.3 / 2.0;
        assert_relative_eq!(nat.log_pdf(&x.view()).unwrap()[[0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_entropy_of_rayleigh() {
        // Rayleigh(σ = 1) entropy: 1 + ln(1/√2) + γ/2.
        let nat = ChiNP::new(ChiSquareNP::new(scalar(0.0)).unwrap());
        let entropy = nat.to_exp().unwrap().entropy().unwrap();
        let expected = 1.0 + (1.0 / 2.0_f64.sqrt()).ln()
            + ef_core::math::EULER_MASCHERONI / 2.0;
        assert_relative_eq!(entropy[[0]], expected, max_relative = 1e-6);
    }

    #[test]
    fn test_sufficient_statistics_square_observations() {
        let nat = ChiNP::new(ChiSquareNP::new(scalar(0.5)).unwrap());
        let x = scalar(2.0);
        let stats = nat.sufficient_statistics(&x.view()).unwrap();
        // ln(x^2) = 2 ln 2.
        assert_relative_eq!(stats.base().mean_log()[[0]], 2.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }
}
