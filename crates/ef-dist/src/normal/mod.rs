//! The normal families: univariate, isotropic, diagonal, fixed-variance,
//! and arbitrary-covariance multivariate.

pub mod arbitrary;
pub mod diagonal;
pub mod fixed_variance;
pub mod isotropic;
mod linalg;
pub mod univariate;

pub use arbitrary::{MultivariateNormalEP, MultivariateNormalNP, MultivariateNormalVP};
pub use diagonal::{DiagonalNormalEP, DiagonalNormalNP};
pub use fixed_variance::{FixedVarianceNormalEP, FixedVarianceNormalNP};
pub use isotropic::{IsotropicNormalEP, IsotropicNormalNP};
pub use univariate::{NormalEP, NormalNP, NormalVP};
