//! # ef-dist
//!
//! Concrete exponential-family distributions over batched `ndarray`
//! containers. Each family exposes its natural and expectation
//! parametrizations as separate immutable containers implementing the
//! `ef-exp` traits; families whose expectation-to-natural conversion has no
//! closed form (gamma, chi-square, beta, Dirichlet, von Mises-Fisher) run it
//! through the generic Newton solver.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bernoulli;
pub mod beta;
pub mod chi;
pub mod chi_square;
pub mod dirichlet;
pub mod exponential;
pub mod gamma;
pub mod geometric;
pub mod multinomial;
mod nb_common;
pub mod neg_binomial;
pub mod normal;
pub mod poisson;
mod util;
pub mod von_mises;
pub mod weibull;

pub use bernoulli::{BernoulliEP, BernoulliNP};
pub use beta::{BetaEP, BetaNP};
pub use chi::{ChiEP, ChiNP, SquareTransform};
pub use chi_square::{ChiSquareEP, ChiSquareNP};
pub use dirichlet::{DirichletEP, DirichletNP};
pub use exponential::{ExponentialEP, ExponentialNP};
pub use gamma::{GammaEP, GammaNP};
pub use geometric::{GeometricEP, GeometricNP};
pub use multinomial::{MultinomialEP, MultinomialNP};
pub use neg_binomial::{NegativeBinomialEP, NegativeBinomialNP};
pub use normal::{
    DiagonalNormalEP, DiagonalNormalNP, FixedVarianceNormalEP, FixedVarianceNormalNP,
    IsotropicNormalEP, IsotropicNormalNP, MultivariateNormalEP, MultivariateNormalNP,
    MultivariateNormalVP, NormalEP, NormalNP, NormalVP,
};
pub use poisson::{PoissonEP, PoissonNP};
pub use von_mises::{VonMisesFisherEP, VonMisesFisherNP};
pub use weibull::{WeibullEP, WeibullNP};
