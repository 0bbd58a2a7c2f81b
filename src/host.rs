//! Boundary between the solver and the application owning the point data.
//!
//! A [`PointSource`] hands over the coordinates of an externally managed point collection and an
//! [`AttributeSink`] receives the mapped positions as one flat row-major array, the layout host
//! applications typically store as a detail/global array attribute.

use std::collections::BTreeMap;

use ndarray::prelude::*;
use tracing::info;

use crate::error::OTError;
use crate::regularized::config::SinkhornConfig;
use crate::regularized::sinkhorn::{sinkhorn_log, ConvergenceInfo};
use crate::transport::{apply_transport, flatten_positions};

/// Name of the attribute receiving the flattened mapped positions
pub const MAPPED_POSITIONS_ATTRIBUTE: &str = "ot_flat_pos_array";

/// Source of point coordinates
pub trait PointSource {
    /// n x d array of point coordinates
    fn read_points(&self) -> Result<Array2<f64>, OTError>;
}

/// Destination for per-point results written as flat numeric arrays
pub trait AttributeSink {
    fn write_attribute(&mut self, name: &str, values: Vec<f64>) -> Result<(), OTError>;
}

impl PointSource for Array2<f64> {
    fn read_points(&self) -> Result<Array2<f64>, OTError> {
        Ok(self.clone())
    }
}

impl PointSource for Vec<[f64; 3]> {
    fn read_points(&self) -> Result<Array2<f64>, OTError> {
        let flat: Vec<f64> = self.iter().flat_map(|p| p.iter().cloned()).collect();

        Array2::from_shape_vec((self.len(), 3), flat).map_err(|err| OTError::Other(err.into()))
    }
}

impl AttributeSink for BTreeMap<String, Vec<f64>> {
    fn write_attribute(&mut self, name: &str, values: Vec<f64>) -> Result<(), OTError> {
        self.insert(name.to_string(), values);
        Ok(())
    }
}

/// Transports the source point cloud onto the target point cloud with uniform weights and writes
/// the mapped source positions to `sink` under [`MAPPED_POSITIONS_ATTRIBUTE`].
///
/// Nothing is written when the solve fails.
pub fn transport_point_clouds<P, Q, A>(
    source: &P,
    target: &Q,
    sink: &mut A,
    config: &SinkhornConfig,
) -> Result<ConvergenceInfo, OTError>
where
    P: PointSource + ?Sized,
    Q: PointSource + ?Sized,
    A: AttributeSink + ?Sized,
{
    let source_points = source.read_points()?;
    let target_points = target.read_points()?;

    let solution = sinkhorn_log(&source_points, &target_points, None, None, config, None)?;
    let mapped = apply_transport(&solution.plan, &target_points)?;

    sink.write_attribute(MAPPED_POSITIONS_ATTRIBUTE, flatten_positions(&mapped))?;

    info!(
        n = source_points.nrows(),
        m = target_points.nrows(),
        iterations = solution.info.iterations,
        kind = %solution.info.kind,
        "point clouds transported"
    );

    Ok(solution.info)
}
