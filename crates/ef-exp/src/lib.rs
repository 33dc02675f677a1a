//! # ef-exp
//!
//! Exponential-family algebra over batched `ndarray` containers:
//! - the [`Parametrization`] base protocol and generic parameter dot product
//! - the dual [`NaturalParametrization`] / [`ExpectationParametrization`]
//!   traits with cross-entropy / entropy / KL derived generically
//! - the batched Newton [`ExpToNat`] solver for families whose
//!   expectation-to-natural map has no closed form
//! - [`transformed`] parametrizations (change of observed variable)
//! - conjugate-prior and sampling capabilities
//!
//! Concrete families live in `ef-dist`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conjugate;
pub mod exp_to_nat;
pub mod expectation;
pub mod multidimensional;
pub mod natural;
pub mod parametrization;
pub mod samplable;
pub mod transformed;

pub use conjugate::{HasConjugatePrior, HasGeneralizedConjugatePrior};
pub use exp_to_nat::{ExpToNat, ExpToNatDiagnostics, ExpToNatOptions};
pub use expectation::ExpectationParametrization;
pub use multidimensional::Multidimensional;
pub use natural::NaturalParametrization;
pub use parametrization::{parameters_dot_product, Field, Parametrization};
pub use samplable::Samplable;
pub use transformed::{ObservationTransform, TransformedEP, TransformedNP};
