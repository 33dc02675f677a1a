//! Shared forms of the negative-binomial family (geometric, negative
//! binomial): the count `x` of successes before `r` failures, with natural
//! parameter `η = ln p` for per-trial success probability `p`.

use ef_core::shape::broadcast_apply;
use ef_core::Result;
use ndarray::{ArrayD, ArrayViewD};

/// `A(η) = -r ln(1 - e^η)`, stable for `η < 0` via `expm1`.
pub(crate) fn log_normalizer(
    log_probability: &ArrayViewD<'_, f64>,
    failures: &ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>> {
    broadcast_apply(log_probability, failures, |eta, r| -r * (-eta.exp_m1()).ln())
}

/// `E[x] = r e^η / (1 - e^η)`.
pub(crate) fn nat_to_mean(
    log_probability: &ArrayViewD<'_, f64>,
    failures: &ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>> {
    broadcast_apply(log_probability, failures, |eta, r| r / (-eta).exp_m1())
}

/// `η = ln(mean / (mean + r))`.
pub(crate) fn mean_to_nat(
    mean: &ArrayViewD<'_, f64>,
    failures: &ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>> {
    broadcast_apply(mean, failures, |m, r| (m / (m + r)).ln())
}
