use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ef_exp::{ExpectationParametrization, NaturalParametrization};
use ndarray::{ArrayD, IxDyn};

use ef_dist::{DirichletNP, GammaNP, MultivariateNormalVP};

fn bench_gamma_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("gamma_exp_to_nat");
    for &batch in &[1usize, 64, 1024] {
        let negative_rate =
            ArrayD::from_shape_fn(IxDyn(&[batch]), |ix| -1.0 - 0.01 * ix[0] as f64);
        let shape_minus_one =
            ArrayD::from_shape_fn(IxDyn(&[batch]), |ix| 0.5 + 0.005 * ix[0] as f64);
        let ep = GammaNP::new(negative_rate, shape_minus_one).unwrap().to_exp().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(batch), &ep, |b, ep| {
            b.iter(|| black_box(ep.to_nat().unwrap()));
        });
    }
    group.finish();
}

fn bench_dirichlet_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("dirichlet_exp_to_nat");
    for &dims in &[3usize, 10] {
        let alpha_minus_one =
            ArrayD::from_shape_fn(IxDyn(&[32, dims]), |ix| 0.2 * (1 + ix[1]) as f64);
        let ep = DirichletNP::new(alpha_minus_one).unwrap().to_exp().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(dims), &ep, |b, ep| {
            b.iter(|| black_box(ep.to_nat().unwrap()));
        });
    }
    group.finish();
}

fn bench_multivariate_normal_conversion(c: &mut Criterion) {
    let mean = ArrayD::from_shape_fn(IxDyn(&[128, 4]), |ix| 0.1 * ix[1] as f64);
    let covariance = ArrayD::from_shape_fn(IxDyn(&[128, 4, 4]), |ix| {
        if ix[1] == ix[2] {
            1.0 + 0.1 * ix[1] as f64
        } else {
            0.05
        }
    });
    let ep = MultivariateNormalVP::new(mean, covariance).unwrap().to_exp().unwrap();
    c.bench_function("multivariate_normal_exp_to_nat_128x4", |b| {
        b.iter(|| black_box(ep.to_nat().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_gamma_solver,
    bench_dirichlet_solver,
    bench_multivariate_normal_conversion
);
criterion_main!(benches);
