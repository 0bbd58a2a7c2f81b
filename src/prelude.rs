//! sinkhorn-point-transport prelude
//!
//! This module contains the most used types, traits, and functions
//!
//! ```
//! use sinkhorn_point_transport::prelude::*;
//!
//! ```

pub use crate::OTSolver;

pub use crate::error::OTError;

pub use crate::regularized::config::SinkhornConfig;

pub use crate::regularized::sinkhorn::{
    sinkhorn_log, ConvergenceInfo, ConvergenceKind, SinkhornLogDomain, TransportSolution,
};

pub use crate::transport::{apply_transport, flatten_positions, interpolate};

pub use crate::host::{transport_point_clouds, AttributeSink, PointSource};

pub use crate::metrics::{dist, MetricType::Euclidean, MetricType::SqEuclidean};
