use anyhow::anyhow;
use ndarray::prelude::*;
use ndarray_einsum_beta::*;

use crate::error::OTError;

pub enum MetricType {
    SqEuclidean,
    Euclidean,
}

/// Compute distance between samples in x1 and x2
/// x1: matrix with n1 samples of size d
/// x2: matrix with n2 samples of size d
/// metric: choice of distance metric
pub fn dist(x1: &Array2<f64>, x2: &Array2<f64>, metric: MetricType) -> Result<Array2<f64>, OTError> {
    match metric {
        MetricType::SqEuclidean => euclidean_distances(x1, x2, true),
        MetricType::Euclidean => euclidean_distances(x1, x2, false),
    }
}

/// Row-wise sum of squares, einsum('ij,ij->i', X, X)
fn squared_norms(x: &Array2<f64>) -> Result<Array1<f64>, OTError> {
    let norms = einsum("ij,ij->i", &[x, x]).map_err(|err| OTError::Other(anyhow!(err)))?;

    norms
        .into_dimensionality::<Ix1>()
        .map_err(|err| OTError::Other(anyhow!(err)))
}

/// Considering the rows of X and Y as vectors, compute the distance matrix between each pair
/// of vectors
/// X: matrix of nsamples_x x nfeatures
/// Y: matrix of nsamples_y x nfeatures
/// squared: Return squared Euclidean distances
fn euclidean_distances(x: &Array2<f64>, y: &Array2<f64>, squared: bool) -> Result<Array2<f64>, OTError> {
    if x.ncols() != y.ncols() {
        return Err(OTError::PointDimensionError {
            source_dim: x.ncols(),
            target_dim: y.ncols(),
        });
    }

    let a2 = squared_norms(x)?;
    let b2 = squared_norms(y)?;

    // c = -2 * X.Y^T + a2[:, None] + b2[None, :]
    let mut c = x.dot(&y.t()) * -2f64;
    c += &a2.insert_axis(Axis(1));
    c += &b2.insert_axis(Axis(0));

    // cancellation can leave tiny negatives
    c.mapv_inplace(|val| val.max(0f64));

    if !squared {
        c.mapv_inplace(f64::sqrt);
    }

    if x == y {
        c.diag_mut().fill(0f64);
    }

    Ok(c)
}
