//! Cross-family laws: parametrization round-trips, solver self-consistency,
//! information-theoretic identities, sampling moments, and conjugate-prior
//! behavior.

use approx::assert_relative_eq;
use ef_exp::{
    ExpToNat, ExpToNatOptions, ExpectationParametrization, HasConjugatePrior,
    NaturalParametrization, Samplable,
};
use ndarray::{ArrayD, Axis, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ef_dist::{
    BernoulliEP, BetaNP, DirichletNP, ExponentialEP, GammaNP, IsotropicNormalEP, MultinomialNP,
    MultivariateNormalVP, NormalVP, PoissonEP, VonMisesFisherNP,
};

fn scalar(v: f64) -> ArrayD<f64> {
    ArrayD::from_elem(IxDyn(&[1]), v)
}

fn vector(v: &[f64]) -> ArrayD<f64> {
    ArrayD::from_shape_vec(IxDyn(&[1, v.len()]), v.to_vec()).unwrap()
}

#[test]
fn closed_form_roundtrips() {
    let bernoulli = BernoulliEP::new(scalar(0.42)).unwrap();
    let back = bernoulli.to_nat().unwrap().to_exp().unwrap();
    assert_relative_eq!(back.probability()[[0]], 0.42, max_relative = 1e-10);

    let poisson = PoissonEP::new(scalar(6.0)).unwrap();
    let back = poisson.to_nat().unwrap().to_exp().unwrap();
    assert_relative_eq!(back.mean()[[0]], 6.0, max_relative = 1e-10);

    let exponential = ExponentialEP::new(scalar(0.8)).unwrap();
    let back = exponential.to_nat().unwrap().to_exp().unwrap();
    assert_relative_eq!(back.mean()[[0]], 0.8, max_relative = 1e-10);
}

#[test]
fn solver_roundtrips_stay_within_tolerance() {
    let gamma = GammaNP::new(scalar(-1.5), scalar(2.0)).unwrap();
    let back = gamma.to_exp().unwrap().to_nat().unwrap();
    assert_relative_eq!(back.negative_rate()[[0]], -1.5, max_relative = 1e-5);
    assert_relative_eq!(back.shape_minus_one()[[0]], 2.0, max_relative = 1e-5);

    let dirichlet = DirichletNP::new(vector(&[0.2, 1.0, 4.0])).unwrap();
    let back = dirichlet.to_exp().unwrap().to_nat().unwrap();
    for (i, v) in [0.2, 1.0, 4.0].iter().enumerate() {
        assert_relative_eq!(
            back.alpha_minus_one()[[0, i]],
            v - 1.0,
            max_relative = 1e-4,
            epsilon = 1e-4
        );
    }

    let vmf = VonMisesFisherNP::new(vector(&[0.9, 1.2])).unwrap();
    let back = vmf.to_exp().unwrap().to_nat().unwrap();
    assert_relative_eq!(back.mean_times_concentration()[[0, 0]], 0.9, max_relative = 1e-4);
    assert_relative_eq!(back.mean_times_concentration()[[0, 1]], 1.2, max_relative = 1e-4);
}

#[test]
fn solver_diagnostics_report_converged_residuals() {
    let ep = GammaNP::new(scalar(-0.7), scalar(3.3)).unwrap().to_exp().unwrap();
    let (_, diagnostics) =
        ep.to_nat_with_diagnostics(&ExpToNatOptions::default()).unwrap();
    assert!(diagnostics.converged, "residuals: {:?}", diagnostics.residual_norms);
    for norm in &diagnostics.residual_norms {
        assert!(*norm <= 1e-10);
    }
}

#[test]
fn entropy_is_self_cross_entropy() {
    let ep = NormalVP::new(scalar(0.3), scalar(1.7)).unwrap().to_exp().unwrap();
    let nat = ep.to_nat().unwrap();
    assert_relative_eq!(
        ep.entropy().unwrap()[[0]],
        ep.cross_entropy(&nat).unwrap()[[0]],
        epsilon = 1e-12
    );
}

#[test]
fn kl_divergence_is_nonnegative_and_zero_at_equality() {
    let p = GammaNP::new(scalar(-2.0), scalar(1.0)).unwrap();
    let q = GammaNP::new(scalar(-0.5), scalar(4.0)).unwrap();
    let p_exp = p.to_exp().unwrap();

    let self_kl = p_exp.kl_divergence(&p.to_exp().unwrap().to_nat().unwrap()).unwrap();
    assert_relative_eq!(self_kl[[0]], 0.0, epsilon = 1e-8);

    let cross_kl = p_exp.kl_divergence(&q).unwrap();
    assert!(cross_kl[[0]] > 0.0);

    // Gibbs' inequality: cross entropy is at least entropy.
    assert!(
        p_exp.cross_entropy(&q).unwrap()[[0]] >= p_exp.entropy().unwrap()[[0]]
    );
}

#[test]
fn sampled_sufficient_statistics_average_to_expectation_parameters() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 40_000;

    let bernoulli = BernoulliEP::new(scalar(0.3)).unwrap();
    let draws = bernoulli.sample(&mut rng, &[n]).unwrap();
    let empirical = draws.mean_axis(Axis(0)).unwrap();
    assert_relative_eq!(empirical[[0]], 0.3, epsilon = 0.01);

    let exponential = ExponentialEP::new(scalar(2.0)).unwrap();
    let draws = exponential.sample(&mut rng, &[n]).unwrap();
    let nat = exponential.to_nat().unwrap();
    let stats = nat.sufficient_statistics(&draws.view()).unwrap();
    let empirical = stats.mean().mean_axis(Axis(0)).unwrap();
    assert_relative_eq!(empirical[[0]], 2.0, epsilon = 0.05);

    let normal = NormalVP::new(scalar(-1.0), scalar(0.25)).unwrap();
    let draws = normal.sample(&mut rng, &[n]).unwrap();
    let stats = normal
        .to_exp()
        .unwrap()
        .to_nat()
        .unwrap()
        .sufficient_statistics(&draws.view())
        .unwrap();
    let mean = stats.mean().mean_axis(Axis(0)).unwrap();
    let second = stats.second_moment().mean_axis(Axis(0)).unwrap();
    assert_relative_eq!(mean[[0]], -1.0, epsilon = 0.01);
    assert_relative_eq!(second[[0]], 1.25, epsilon = 0.03);
}

#[test]
fn multivariate_sampling_matches_covariance() {
    let mut rng = StdRng::seed_from_u64(11);
    let vp = MultivariateNormalVP::new(
        vector(&[1.0, -2.0]),
        ArrayD::from_shape_vec(IxDyn(&[1, 2, 2]), vec![1.0, 0.6, 0.6, 2.0]).unwrap(),
    )
    .unwrap();
    let draws = vp.sample(&mut rng, &[30_000]).unwrap();
    assert_eq!(draws.shape(), &[30_000, 1, 2]);

    let stats = vp.to_exp().unwrap().to_nat().unwrap().sufficient_statistics(&draws.view()).unwrap();
    let mean = stats.mean().mean_axis(Axis(0)).unwrap();
    let second = stats.second_moment().mean_axis(Axis(0)).unwrap();
    assert_relative_eq!(mean[[0, 0]], 1.0, epsilon = 0.03);
    assert_relative_eq!(mean[[0, 1]], -2.0, epsilon = 0.04);
    // E[x₀x₁] = cov + μ₀μ₁ = 0.6 - 2.0.
    assert_relative_eq!(second[[0, 0, 1]], -1.4, epsilon = 0.06);
}

#[test]
fn conjugate_prior_concentrates_on_observation() {
    // With many pseudo-observations the prior's expectation approaches the
    // observation implied by the current parameters.
    let bernoulli = BernoulliEP::new(scalar(0.3)).unwrap();
    let prior: BetaNP = bernoulli
        .conjugate_prior_distribution(&scalar(1e6).view())
        .unwrap();
    let prior_exp = prior.to_exp().unwrap();
    // E[ln x] under a sharply peaked beta approaches ln(observation).
    assert_relative_eq!(
        prior_exp.mean_log_probability()[[0, 0]],
        0.3_f64.ln(),
        max_relative = 1e-4
    );

    let poisson = PoissonEP::new(scalar(5.0)).unwrap();
    let prior: GammaNP = poisson.conjugate_prior_distribution(&scalar(1e6).view()).unwrap();
    let prior_exp = prior.to_exp().unwrap();
    assert_relative_eq!(prior_exp.mean()[[0]], 5.0, max_relative = 1e-4);
    assert_relative_eq!(
        poisson.conjugate_prior_observation().unwrap()[[0]],
        5.0,
        epsilon = 1e-12
    );
}

#[test]
fn bernoulli_scenario() {
    let nat = ef_dist::BernoulliNP::new(scalar(0.0)).unwrap();
    assert_relative_eq!(nat.log_normalizer().unwrap()[[0]], 2.0_f64.ln(), epsilon = 1e-12);
    let ep = BernoulliEP::new(scalar(0.5)).unwrap();
    assert_relative_eq!(ep.entropy().unwrap()[[0]], 2.0_f64.ln(), epsilon = 1e-12);
}

#[test]
fn isotropic_scenario() {
    let ep = IsotropicNormalEP::new(
        ArrayD::zeros(IxDyn(&[1, 3])),
        scalar(3.0),
    )
    .unwrap();
    let nat = ep.to_nat().unwrap();
    assert_relative_eq!(nat.negative_half_precision()[[0]], -0.5, epsilon = 1e-12);
}

#[test]
fn multinomial_extreme_logits_stay_finite() {
    let nat = MultinomialNP::new(vector(&[1000.0, -1000.0])).unwrap();
    let a = nat.log_normalizer().unwrap()[[0]];
    assert!(a.is_finite());
    let probability = nat.to_exp().unwrap();
    assert_relative_eq!(probability.probability()[[0, 0]], 1.0, epsilon = 1e-9);
}

#[test]
fn mismatched_batch_shapes_fail_at_construction() {
    let mean = ArrayD::zeros(IxDyn(&[4]));
    let second = ArrayD::zeros(IxDyn(&[5]));
    assert!(ef_dist::NormalEP::new(mean, second).is_err());

    let mean = ArrayD::zeros(IxDyn(&[2, 3]));
    let cov = ArrayD::zeros(IxDyn(&[3, 3, 3]));
    assert!(MultivariateNormalVP::new(mean, cov).is_err());

    // Non-square matrix events are rejected too.
    let mean = ArrayD::zeros(IxDyn(&[2, 3]));
    let cov = ArrayD::zeros(IxDyn(&[2, 3, 2]));
    assert!(MultivariateNormalVP::new(mean, cov).is_err());
}
