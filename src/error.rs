use thiserror::Error;

use crate::reductions::ReductionError;

#[derive(Error, Debug)]
pub enum OTError {
    #[error("Invalid configuration: '{0}'")]
    InvalidConfiguration(String),

    #[error("Empty point set, source has {n:?} points and target has {m:?} points")]
    EmptyInput { n: usize, m: usize },

    #[error(
        "Point dimensions do not match, source points are {source_dim:?}-dimensional \
            and target points are {target_dim:?}-dimensional"
    )]
    PointDimensionError {
        source_dim: usize,
        target_dim: usize,
    },

    #[error(
        "Sample weight dimensions, source distribution \
            {dim_a:?} and target distribution {dim_b:?}, do \
            not match point counts ({n:?}, {m:?})"
    )]
    WeightDimensionError {
        dim_a: usize,
        dim_b: usize,
        n: usize,
        m: usize,
    },

    #[error("Invalid weights: '{0}'")]
    InvalidWeights(String),

    #[error(
        "Transport plan of shape ({plan_rows:?}, {plan_cols:?}) cannot be \
            applied to {points:?} target points"
    )]
    PlanShapeError {
        plan_rows: usize,
        plan_cols: usize,
        points: usize,
    },

    #[error("Invalid argument: '{0}'")]
    ArgError(String),

    #[error(transparent)]
    Reduction(#[from] ReductionError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
