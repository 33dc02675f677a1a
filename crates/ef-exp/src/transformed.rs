//! Transformed parametrizations: derive one family from another by an
//! invertible transform of the observed variable.
//!
//! The transform leaves the exponential form in `η` untouched, so the
//! log-normalizer and both conversions delegate to the base family; only the
//! carrier measure picks up a Jacobian correction and the sufficient
//! statistics are evaluated at the transformed observation.

use std::marker::PhantomData;

use ef_core::shape::broadcast_apply;
use ef_core::Result;
use ndarray::{ArrayD, ArrayViewD};

use crate::expectation::ExpectationParametrization;
use crate::natural::NaturalParametrization;
use crate::parametrization::{Field, Parametrization};

/// A deterministic, invertible transform of the observation variable,
/// mapping observations of the derived family into the base family.
pub trait ObservationTransform<Base: NaturalParametrization> {
    /// Map a derived-family observation to a base-family observation.
    fn sample_to_base_sample(x: &ArrayViewD<'_, f64>) -> ArrayD<f64>;

    /// `log |d(sample_to_base_sample)/dx|`, the carrier-measure correction.
    fn log_jacobian(x: &ArrayViewD<'_, f64>) -> ArrayD<f64>;

    /// `E[k(x)]` of the derived family, given the base natural parameters.
    fn expected_carrier_measure(base: &Base) -> Result<ArrayD<f64>>;
}

/// Natural parametrization of a transformed family.
#[derive(Debug, Clone)]
pub struct TransformedNP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    base: Base,
    transform: PhantomData<T>,
}

/// Expectation parametrization of a transformed family.
#[derive(Debug, Clone)]
pub struct TransformedEP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    base: Base::Expectation,
    transform: PhantomData<T>,
}

impl<Base, T> TransformedNP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    /// Wrap base-family natural parameters.
    pub fn new(base: Base) -> Self {
        Self { base, transform: PhantomData }
    }

    /// The base-family natural parameters (same numeric payload).
    pub fn base(&self) -> &Base {
        &self.base
    }
}

impl<Base, T> TransformedEP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    /// Wrap base-family expectation parameters.
    pub fn new(base: Base::Expectation) -> Self {
        Self { base, transform: PhantomData }
    }

    /// The base-family expectation parameters (same numeric payload).
    pub fn base(&self) -> &Base::Expectation {
        &self.base
    }
}

impl<Base, T> Parametrization for TransformedNP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    fn fields(&self) -> Vec<Field<'_>> {
        self.base.fields()
    }

    fn shape(&self) -> &[usize] {
        self.base.shape()
    }
}

impl<Base, T> Parametrization for TransformedEP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    fn fields(&self) -> Vec<Field<'_>> {
        self.base.fields()
    }

    fn shape(&self) -> &[usize] {
        self.base.shape()
    }
}

impl<Base, T> NaturalParametrization for TransformedNP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    type Expectation = TransformedEP<Base, T>;

    fn log_normalizer(&self) -> Result<ArrayD<f64>> {
        // The transform only changes k(x) and t(x), not the η-form.
        self.base.log_normalizer()
    }

    fn to_exp(&self) -> Result<Self::Expectation> {
        Ok(TransformedEP::new(self.base.to_exp()?))
    }

    fn carrier_measure(&self, x: &ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        let base_x = T::sample_to_base_sample(x);
        let base_carrier = self.base.carrier_measure(&base_x.view())?;
        let correction = T::log_jacobian(x);
        broadcast_apply(&base_carrier.view(), &correction.view(), |k, j| k + j)
    }

    fn sufficient_statistics(&self, x: &ArrayViewD<'_, f64>) -> Result<Self::Expectation> {
        let base_x = T::sample_to_base_sample(x);
        Ok(TransformedEP::new(self.base.sufficient_statistics(&base_x.view())?))
    }
}

impl<Base, T> ExpectationParametrization for TransformedEP<Base, T>
where
    Base: NaturalParametrization,
    T: ObservationTransform<Base>,
{
    type Natural = TransformedNP<Base, T>;

    fn to_nat(&self) -> Result<Self::Natural> {
        Ok(TransformedNP::new(self.base.to_nat()?))
    }

    fn expected_carrier_measure(&self) -> Result<ArrayD<f64>> {
        T::expected_carrier_measure(&self.base.to_nat()?)
    }
}
