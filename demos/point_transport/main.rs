use std::collections::BTreeMap;

use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ot::host::MAPPED_POSITIONS_ATTRIBUTE;
use ot::prelude::*;
use sinkhorn_point_transport as ot;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let n_samples = 200;
    let mut rng = StdRng::seed_from_u64(0);

    // Mean, Covariance of the source and target distributions
    let mu_source = array![0., 0., 0.];
    let cov_source = array![[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]];

    let mu_target = array![4., 4., 1.];
    let cov_target = array![[1., -0.8, 0.], [-0.8, 1., 0.], [0., 0., 0.2]];

    let source = match ot::utils::distributions::sample_gauss(n_samples, &mu_source, &cov_source, &mut rng) {
        Ok(val) => val,
        Err(err) => panic!("{:?}", err),
    };

    let target = match ot::utils::distributions::sample_gauss(n_samples, &mu_target, &cov_target, &mut rng) {
        Ok(val) => val,
        Err(err) => panic!("{:?}", err),
    };

    let mut attributes: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    let info = match transport_point_clouds(&source, &target, &mut attributes, &SinkhornConfig::point_cloud()) {
        Ok(info) => info,
        Err(error) => panic!("{:?}", error),
    };

    println!(
        "{} after {} iterations (epsilon = {}, marginal error = {:.3e})",
        info.kind, info.iterations, info.epsilon, info.marginal_error
    );

    let flat = &attributes[MAPPED_POSITIONS_ATTRIBUTE];
    let mapped = match Array2::from_shape_vec((n_samples, 3), flat.clone()) {
        Ok(val) => val,
        Err(err) => panic!("{:?}", err),
    };

    // a few frames of the displacement between the two clouds
    for t in [0.0, 0.25, 0.5, 0.75, 1.0].iter() {
        let frame = match interpolate(&source, &mapped, *t) {
            Ok(val) => val,
            Err(err) => panic!("{:?}", err),
        };
        println!("t = {:.2}: centroid {:?}", t, frame.mean_axis(Axis(0)).unwrap());
    }
}
