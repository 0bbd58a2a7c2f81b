//! Applying a transport plan to point sets

use ndarray::prelude::*;

use crate::error::OTError;

/// Maps source points through a transport plan: mapped = plan . target
///
/// Each output row is the barycenter of the target points weighted by the matching plan row, so
/// with a row-stochastic plan every mapped point lies in the convex hull of the target set.
///
/// plan: n x m transport plan
/// target: m x d target points
pub fn apply_transport(plan: &Array2<f64>, target: &Array2<f64>) -> Result<Array2<f64>, OTError> {
    if plan.ncols() != target.nrows() {
        return Err(OTError::PlanShapeError {
            plan_rows: plan.nrows(),
            plan_cols: plan.ncols(),
            points: target.nrows(),
        });
    }

    Ok(plan.dot(target))
}

/// Displacement interpolation between the source points (t = 0) and their mapped positions (t = 1)
pub fn interpolate(source: &Array2<f64>, mapped: &Array2<f64>, t: f64) -> Result<Array2<f64>, OTError> {
    if !(0.0..=1.0).contains(&t) {
        return Err(OTError::ArgError(format!(
            "interpolation parameter {} outside [0, 1]",
            t
        )));
    }

    if source.dim() != mapped.dim() {
        return Err(OTError::ArgError(format!(
            "source shape {:?} does not match mapped shape {:?}",
            source.dim(),
            mapped.dim()
        )));
    }

    Ok(source * (1. - t) + mapped * t)
}

/// Row-major flattening of n points of dimension d into n*d values
pub fn flatten_positions(points: &Array2<f64>) -> Vec<f64> {
    points.iter().cloned().collect()
}
