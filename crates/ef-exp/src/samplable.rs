//! Sampling capability for parametrizations that can draw observations.

use ef_core::Result;
use ndarray::ArrayD;
use rand::Rng;

/// A parametrization that can draw identically distributed batched samples.
///
/// The result has shape `sample_shape + batch_shape + event_shape`: the
/// requested leading sample axes, then one draw per batch element. The
/// pseudo-random bit generator is supplied by the caller; implementations
/// only provide the deterministic transform from primitive randomness to the
/// family's observations.
pub trait Samplable {
    /// Draw samples using `rng`.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sample_shape: &[usize]) -> Result<ArrayD<f64>>;
}
