//! Error types for ExpFam

use thiserror::Error;

/// ExpFam error type
#[derive(Error, Debug)]
pub enum Error {
    /// Field shapes inconsistent with the declared supports, or containers
    /// with mismatched batch shapes combined in one operation.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Invalid argument value (outside the documented domain).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conversion direction or derived quantity with no implementation
    /// for this family (e.g. a closed-form `to_exp` that does not exist).
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Numerical failure inside a computation (singular matrix, etc.).
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
