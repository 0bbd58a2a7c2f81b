use ndarray::prelude::*;

use crate::error::OTError;

/// Returns the weights used for a point set of `n` points, normalized to sum to one.
/// Absent weights default to the uniform 1/n distribution.
pub fn normalize_weights(weights: Option<&Array1<f64>>, n: usize) -> Result<Array1<f64>, OTError> {
    let weights = match weights {
        Some(val) => val,
        None => return Ok(Array1::<f64>::from_elem(n, 1. / (n as f64))),
    };

    if weights.iter().any(|w| !w.is_finite() || *w < 0.) {
        return Err(OTError::InvalidWeights(
            "weights must be finite and nonnegative".to_string(),
        ));
    }

    let total = weights.sum();
    if total <= 0. {
        return Err(OTError::InvalidWeights("weights sum to zero".to_string()));
    }

    Ok(weights / total)
}

pub mod distributions {

    use ndarray::prelude::*;
    use ndarray_linalg::cholesky::*;
    use ndarray_rand::rand::Rng;
    use ndarray_rand::rand_distr::StandardNormal;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DistributionError {
        #[error("Invalid distribution parameter: '{0}'")]
        InvalidParameter(String),
        #[error("covariance matrix is not positive definite")]
        NotPositiveDefinite,
    }

    /// Returns n samples drawn from a d-dimensional gaussian distribution
    /// n: number of samples to take
    /// mean: mean values of the distribution (length d)
    /// cov: d x d covariance matrix of the distribution
    /// rng: random number generator
    pub fn sample_gauss<R: Rng>(
        n: usize,
        mean: &Array1<f64>,
        cov: &Array2<f64>,
        rng: &mut R,
    ) -> Result<Array2<f64>, DistributionError> {
        let d = mean.len();

        if n == 0 {
            return Err(DistributionError::InvalidParameter(
                "n is not greater than zero".to_string(),
            ));
        }

        if mean.is_empty() || cov.is_empty() {
            return Err(DistributionError::InvalidParameter(
                "zero length mean or covariance".to_string(),
            ));
        }

        if cov.dim() != (d, d) {
            return Err(DistributionError::InvalidParameter(
                "covariance dimensions do not match mean dimensions".to_string(),
            ));
        }

        let mut samples = Array2::<f64>::zeros((n, d));
        for ele in samples.iter_mut() {
            *ele = rng.sample(StandardNormal);
        }

        // add small perturbation to covariance matrix for numerical stability
        let epsilon = 0.0001;
        let cov_perturbed = cov + &(Array2::<f64>::eye(d) * epsilon);

        // Compute cholesky decomposition
        let lower = match cov_perturbed.cholesky(UPLO::Lower) {
            Ok(val) => val,
            Err(_) => return Err(DistributionError::NotPositiveDefinite),
        };

        Ok(samples.dot(&lower.t()) + mean)
    }

}
