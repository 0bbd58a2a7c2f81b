use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sinkhorn_point_transport as ot;

use ot::prelude::*;

fn gaussian_clouds(n: usize, m: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mu_source = array![0., 0.];
    let cov_source = array![[1., 0.], [0., 1.]];

    let mu_target = array![4., 4.];
    let cov_target = array![[1., -0.8], [-0.8, 1.]];

    let source = match ot::utils::distributions::sample_gauss(n, &mu_source, &cov_source, &mut rng) {
        Ok(val) => val,
        Err(err) => panic!("{:?}", err),
    };

    let target = match ot::utils::distributions::sample_gauss(m, &mu_target, &cov_target, &mut rng) {
        Ok(val) => val,
        Err(err) => panic!("{:?}", err),
    };

    (source, target)
}

fn assert_row_stochastic(plan: &Array2<f64>) {
    assert!(plan.iter().all(|p| *p >= 0.0));
    for row in plan.axis_iter(Axis(0)) {
        assert!((row.sum() - 1.0).abs() < 1E-6, "row sum {}", row.sum());
    }
}

#[test]
fn near_identity_integration_test() {
    let points = array![[0., 0.], [10., 10.]];
    let config = SinkhornConfig::new()
        .with_epsilon(0.01)
        .with_max_iterations(200)
        .with_tolerance(1E-8);

    let result = match sinkhorn_log(&points, &points, None, None, &config, None) {
        Ok(result) => result,
        Err(err) => panic!("{:?}", err),
    };

    assert_eq!(result.info.kind, ConvergenceKind::ErrorBelowTolerance);
    assert_eq!(result.info.epsilon, 0.01);
    assert!(result.info.iterations <= 200);

    assert!(result.plan[[0, 0]] > result.plan[[0, 1]]);
    assert!(result.plan[[1, 1]] > result.plan[[1, 0]]);
    assert!(result.plan.abs_diff_eq(&Array2::eye(2), 1E-6));

    let mapped = result.apply(&points).unwrap();
    assert!(mapped.abs_diff_eq(&points, 1E-6));
}

#[test]
fn sinkhorn_integration_test() {
    let gamma = 1E-1;

    let source = array![
        [-0.33422316, -1.40157595],
        [1.01640207, 1.58920135],
        [0.45938047, -0.59832115],
        [-0.90015176, -0.0695026],
        [0.24890721, 0.25353813]
    ];

    let target = array![
        [6.18308211, 2.38144413],
        [4.01974517, 3.3010811],
        [4.99330784, 3.29090987],
        [1.07482414, 6.19599718],
        [2.62013006, 5.61165631]
    ];

    // same kernel as a classical sinkhorn on the cost normalized by its maximum
    let cost = dist(&source, &target, SqEuclidean).unwrap();
    let max_cost = *cost.max().unwrap();

    let result = match SinkhornLogDomain::new(&source, &target)
        .epsilon(gamma * max_cost)
        .min_iterations(1000)
        .iterations(1000)
        .solve()
    {
        Ok(result) => result,
        Err(err) => panic!("{:?}", err),
    };

    let coupling = array![
        [0.05553532, 0.05473157, 0.0475888, 0.0197709, 0.02237341],
        [0.02927879, 0.02724481, 0.03642575, 0.04720207, 0.05984858],
        [0.06377359, 0.0452918, 0.0508736, 0.01629669, 0.02376431],
        [0.01499525, 0.03356821, 0.02415873, 0.07711427, 0.05016355],
        [0.03641705, 0.03916361, 0.04095311, 0.03961608, 0.04385015]
    ];

    // uniform source weights of 1/5 per row
    let truth = coupling * 5.0;

    assert_row_stochastic(&result.plan);
    assert!(result.plan.relative_eq(&truth, 1E-6, 1E-2));
}

#[test]
fn rows_sum_to_one_for_random_clouds() {
    for (seed, (n, m)) in [(1u64, (1usize, 1usize)), (2, (1, 7)), (3, (9, 1)), (4, (40, 25)), (5, (13, 60))]
        .iter()
        .cloned()
    {
        let (source, target) = gaussian_clouds(n, m, seed);

        for epsilon in [0.03, 0.5, 5.0].iter() {
            let config = SinkhornConfig::new().with_epsilon(*epsilon);

            let result = sinkhorn_log(&source, &target, None, None, &config, None).unwrap();

            assert_eq!(result.plan.dim(), (n, m));
            assert_row_stochastic(&result.plan);
        }
    }
}

#[test]
fn mapped_points_stay_in_target_bounds() {
    let (source, target) = gaussian_clouds(50, 30, 11);

    let solution = SinkhornLogDomain::new(&source, &target)
        .config(SinkhornConfig::point_cloud())
        .solve()
        .unwrap();
    let mapped = solution.apply(&target).unwrap();

    assert_eq!(mapped.dim(), (50, 2));
    for axis in 0..2 {
        let low = *target.column(axis).min().unwrap();
        let high = *target.column(axis).max().unwrap();
        for value in mapped.column(axis).iter() {
            assert!(*value >= low - 1E-9 && *value <= high + 1E-9);
        }
    }
}

#[test]
fn empty_inputs_are_rejected() {
    let points = array![[0., 0.], [1., 1.]];
    let empty = Array2::<f64>::zeros((0, 2));
    let config = SinkhornConfig::new();

    match sinkhorn_log(&empty, &points, None, None, &config, None) {
        Err(OTError::EmptyInput { n: 0, m: 2 }) => (),
        other => panic!("{:?}", other),
    }

    match sinkhorn_log(&points, &empty, None, None, &config, None) {
        Err(OTError::EmptyInput { n: 2, m: 0 }) => (),
        other => panic!("{:?}", other),
    }
}

#[test]
fn invalid_configuration_is_rejected() {
    let points = array![[0., 0.], [1., 1.]];
    let mut calls = 0;

    let zero_epsilon = SinkhornLogDomain::new(&points, &points)
        .epsilon(0.)
        .observer(|_, _| calls += 1)
        .solve();
    match zero_epsilon {
        Err(OTError::InvalidConfiguration(_)) => (),
        other => panic!("{:?}", other),
    }

    let min_above_max = SinkhornConfig::new()
        .with_min_iterations(10)
        .with_max_iterations(5);
    match sinkhorn_log(&points, &points, None, None, &min_above_max, None) {
        Err(OTError::InvalidConfiguration(_)) => (),
        other => panic!("{:?}", other),
    }

    assert_eq!(calls, 0);
}

#[test]
fn single_iteration_reports_first_check() {
    let points = array![[0., 0.], [10., 10.]];
    let config = SinkhornConfig::new()
        .with_min_iterations(0)
        .with_max_iterations(1)
        .with_tolerance(1E-8);
    let mut checks = Vec::new();
    let mut observer = |iteration: usize, error: f64| checks.push((iteration, error));

    let result = sinkhorn_log(&points, &points, None, None, &config, Some(&mut observer)).unwrap();

    assert_eq!(result.info.iterations, 1);
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].0, 0);
    assert_eq!(result.info.marginal_error, checks[0].1);

    // the column projection runs last, so the first check already sees a matched target marginal
    let expected = if checks[0].1 < 1E-8 {
        ConvergenceKind::ErrorBelowTolerance
    } else {
        ConvergenceKind::MaxIterationsReached
    };
    assert_eq!(result.info.kind, expected);
    assert_eq!(result.info.kind, ConvergenceKind::ErrorBelowTolerance);
}

#[test]
fn max_iterations_reached_when_min_iterations_blocks_stopping() {
    let (source, target) = gaussian_clouds(6, 4, 21);
    let config = SinkhornConfig::new()
        .with_min_iterations(70)
        .with_max_iterations(70);
    let mut checks = Vec::new();
    let mut observer = |iteration: usize, _: f64| checks.push(iteration);

    let result = sinkhorn_log(&source, &target, None, None, &config, Some(&mut observer)).unwrap();

    assert_eq!(result.info.kind, ConvergenceKind::MaxIterationsReached);
    assert_eq!(result.info.iterations, 70);
    assert_eq!(checks, vec![0, 32, 64, 69]);
    assert_row_stochastic(&result.plan);
}

#[test]
fn converged_solve_stops_at_first_check_after_min_iterations() {
    let (source, target) = gaussian_clouds(8, 8, 5);
    let config = SinkhornConfig::new().with_epsilon(1.0);

    let result = sinkhorn_log(&source, &target, None, None, &config, None).unwrap();

    assert_ne!(result.info.kind, ConvergenceKind::MaxIterationsReached);
    assert_eq!(result.info.iterations, 33);
}

#[test]
fn stagnating_error_stops_at_second_check() {
    let (source, target) = gaussian_clouds(30, 40, 17);
    let config = SinkhornConfig::new()
        .with_epsilon(1.0)
        .with_min_iterations(1)
        .with_tolerance(f64::MIN_POSITIVE);
    let mut checks = Vec::new();
    let mut observer = |iteration: usize, error: f64| checks.push((iteration, error));

    let result = sinkhorn_log(&source, &target, None, None, &config, Some(&mut observer)).unwrap();

    // the iteration 0 check is below min_iterations and only records the previous error
    let iterations: Vec<usize> = checks.iter().map(|check| check.0).collect();
    assert_eq!(iterations, vec![0, 32]);
    assert!((checks[0].1 - checks[1].1).abs() < 1E-12);

    assert_eq!(result.info.kind, ConvergenceKind::Stagnation);
    assert_eq!(result.info.iterations, 33);
    assert_eq!(result.info.marginal_error, checks[1].1);
    assert_row_stochastic(&result.plan);
}

#[test]
fn rows_are_renormalized_whatever_the_source_weights() {
    // only the target marginal is monitored and every row is rescaled to one afterwards, so the
    // plan does not carry the source weights in its row sums
    let source = array![[0.], [1.], [3.]];
    let target = array![[0.5], [2.5]];
    let source_weights = array![0.1, 0.3, 0.6];
    let target_weights = array![0.5, 0.5];

    let stopped_early = SinkhornLogDomain::new(&source, &target)
        .source_weights(&source_weights)
        .target_weights(&target_weights)
        .epsilon(1.0)
        .min_iterations(0)
        .iterations(1)
        .solve()
        .unwrap();
    assert_row_stochastic(&stopped_early.plan);

    let converged = SinkhornLogDomain::new(&source, &target)
        .source_weights(&source_weights)
        .target_weights(&target_weights)
        .epsilon(5.0)
        .min_iterations(150)
        .iterations(150)
        .solve()
        .unwrap();
    assert_row_stochastic(&converged.plan);

    // weighting the rows by the source weights recovers the target marginal once converged
    let column_mass = converged.plan.t().dot(&source_weights);
    assert!(column_mass.abs_diff_eq(&target_weights, 1E-6));
}

#[test]
fn weight_errors_are_reported() {
    let points = array![[0., 0.], [1., 1.]];
    let short = array![1.0];
    let negative = array![1.0, -1.0];
    let uniform = array![1.0, 1.0];
    let config = SinkhornConfig::new();

    match sinkhorn_log(&points, &points, Some(&short), None, &config, None) {
        Err(OTError::WeightDimensionError { dim_a: 1, dim_b: 2, n: 2, m: 2 }) => (),
        other => panic!("{:?}", other),
    }

    match sinkhorn_log(&points, &points, Some(&uniform), Some(&negative), &config, None) {
        Err(OTError::InvalidWeights(_)) => (),
        other => panic!("{:?}", other),
    }
}

#[test]
fn point_transport_pipeline() {
    let (source, target) = gaussian_clouds(20, 20, 3);
    let mut sink = std::collections::BTreeMap::<String, Vec<f64>>::new();

    let info = transport_point_clouds(&source, &target, &mut sink, &SinkhornConfig::point_cloud()).unwrap();
    assert!(info.iterations >= 1);

    let flat = &sink[ot::host::MAPPED_POSITIONS_ATTRIBUTE];
    let mapped = Array2::from_shape_vec((20, 2), flat.clone()).unwrap();

    let halfway = interpolate(&source, &mapped, 0.5).unwrap();
    assert!(halfway.abs_diff_eq(&((&source + &mapped) / 2.0), 1E-12));
}
