//! Core building blocks for ExpFam.
//!
//! This crate hosts the pieces shared by the algebra and distribution crates:
//! - the error taxonomy ([`Error`], [`Result`])
//! - support descriptors declaring each field's event-shape contract
//! - batch-shape arithmetic and broadcasting helpers
//! - small numerically-stable math primitives

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod math;
pub mod shape;
pub mod support;

pub use error::{Error, Result};
pub use support::{Support, SupportKind};
