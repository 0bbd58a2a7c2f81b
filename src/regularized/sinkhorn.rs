use std::fmt;

use ndarray::{prelude::*, Zip};
use ndarray_stats::QuantileExt;
use tracing::{debug, trace};

use super::config::SinkhornConfig;
use crate::metrics::{dist, MetricType};
use crate::reductions::{all_finite, logsumexp};
use crate::transport::apply_transport;
use crate::utils::normalize_weights;
use crate::{OTError, OTSolver};

/// Added to the weights before taking their logarithm
const WEIGHT_FLOOR: f64 = 1E-256;

/// Added to each row sum in the final renormalization
const ROW_SUM_FLOOR: f64 = 1E-300;

/// Minimum change of the marginal error between two checks to keep iterating
const STAGNATION_THRESHOLD: f64 = 1E-12;

/// The marginal error is measured on iterations that are a multiple of this
const CHECK_INTERVAL: usize = 32;

/// Why the Sinkhorn loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceKind {
    ErrorBelowTolerance,
    Stagnation,
    MaxIterationsReached,
}

impl fmt::Display for ConvergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConvergenceKind::ErrorBelowTolerance => write!(f, "Error < tolerance"),
            ConvergenceKind::Stagnation => write!(f, "Stagnation"),
            ConvergenceKind::MaxIterationsReached => write!(f, "Max iterations reached"),
        }
    }
}

/// Metadata about a finished solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceInfo {
    /// Number of iterations performed
    pub iterations: usize,
    pub epsilon: f64,
    pub kind: ConvergenceKind,
    /// Target marginal error measured by the last check
    pub marginal_error: f64,
}

/// Transport plan together with the metadata of the solve that produced it
#[derive(Debug, Clone)]
pub struct TransportSolution {
    /// n x m row-stochastic plan, entry (i, j) is the mass fraction source i sends to target j
    pub plan: Array2<f64>,
    pub info: ConvergenceInfo,
}

impl TransportSolution {
    /// Maps every source point to the barycenter of the target points weighted by its plan row
    pub fn apply(&self, target: &Array2<f64>) -> Result<Array2<f64>, OTError> {
        apply_transport(&self.plan, target)
    }
}

/// Solves the entropic regularization optimal transport problem between two point clouds with
/// the log-domain Sinkhorn-Knopp algorithm and returns the row-stochastic transport plan.
///
/// ```rust
/// use sinkhorn_point_transport as ot;
/// use ot::prelude::*;
/// use ndarray::prelude::*;
///
/// let source = array![[0., 0.], [10., 10.]];
/// let target = array![[0.5, 0.], [10., 9.5]];
///
/// let solution = match SinkhornLogDomain::new(&source, &target)
///     .epsilon(0.01)
///     .threshold(1E-8)
///     .solve()
/// {
///     Ok(result) => result,
///     Err(error) => panic!("{:?}", error),
/// };
///
/// let mapped = solution.apply(&target).unwrap();
/// assert!(mapped.abs_diff_eq(&target, 1E-6));
/// ```
///
/// source: n x d source points
/// target: m x d target points
/// source_weights, target_weights: optional weights (default uniform)
/// config: regularization, iteration bounds and tolerance
/// observer: called with (iteration, marginal error) on every convergence check
pub struct SinkhornLogDomain<'a> {
    source: &'a Array2<f64>,
    target: &'a Array2<f64>,
    source_weights: Option<&'a Array1<f64>>,
    target_weights: Option<&'a Array1<f64>>,
    config: SinkhornConfig,
    observer: Option<Box<dyn FnMut(usize, f64) + 'a>>,
}

impl<'a> SinkhornLogDomain<'a> {
    pub fn new(source: &'a Array2<f64>, target: &'a Array2<f64>) -> Self {
        Self {
            source,
            target,
            source_weights: None,
            target_weights: None,
            config: SinkhornConfig::default(),
            observer: None,
        }
    }

    pub fn source_weights<'b>(&'b mut self, source_weights: &'a Array1<f64>) -> &'b mut Self {
        self.source_weights = Some(source_weights);
        self
    }

    pub fn target_weights<'b>(&'b mut self, target_weights: &'a Array1<f64>) -> &'b mut Self {
        self.target_weights = Some(target_weights);
        self
    }

    pub fn config<'b>(&'b mut self, config: SinkhornConfig) -> &'b mut Self {
        self.config = config;
        self
    }

    pub fn epsilon<'b>(&'b mut self, epsilon: f64) -> &'b mut Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn min_iterations<'b>(&'b mut self, min_iterations: usize) -> &'b mut Self {
        self.config.min_iterations = min_iterations;
        self
    }

    pub fn iterations<'b>(&'b mut self, max_iterations: usize) -> &'b mut Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn threshold<'b>(&'b mut self, tolerance: f64) -> &'b mut Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn observer<'b, F>(&'b mut self, observer: F) -> &'b mut Self
    where
        F: FnMut(usize, f64) + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }
}

impl<'a> OTSolver for SinkhornLogDomain<'a> {
    /// Ensures the point sets share a dimensionality and the weights match the point counts
    fn check_shape(&self) -> Result<(), OTError> {
        check_inputs(
            self.source,
            self.target,
            self.source_weights,
            self.target_weights,
        )
    }

    fn solve(&mut self) -> Result<TransportSolution, OTError> {
        let observer: Option<&mut dyn FnMut(usize, f64)> = match self.observer.as_mut() {
            Some(observer) => Some(&mut **observer),
            None => None,
        };

        sinkhorn_log(
            self.source,
            self.target,
            self.source_weights,
            self.target_weights,
            &self.config,
            observer,
        )
    }
}

fn check_inputs(
    source: &Array2<f64>,
    target: &Array2<f64>,
    source_weights: Option<&Array1<f64>>,
    target_weights: Option<&Array1<f64>>,
) -> Result<(), OTError> {
    let n = source.nrows();
    let m = target.nrows();

    if n == 0 || m == 0 {
        return Err(OTError::EmptyInput { n, m });
    }

    if source.ncols() != target.ncols() {
        return Err(OTError::PointDimensionError {
            source_dim: source.ncols(),
            target_dim: target.ncols(),
        });
    }

    if !all_finite(source) || !all_finite(target) {
        return Err(OTError::ArgError(
            "points contain non-finite coordinates".to_string(),
        ));
    }

    let dim_a = source_weights.map_or(n, |w| w.len());
    let dim_b = target_weights.map_or(m, |w| w.len());
    if dim_a != n || dim_b != m {
        return Err(OTError::WeightDimensionError { dim_a, dim_b, n, m });
    }

    Ok(())
}

/// Stopping decision of a periodic check, None to keep iterating
fn check_convergence(
    iteration: usize,
    min_iterations: usize,
    marginal_error: f64,
    previous_error: f64,
    tolerance: f64,
) -> Option<ConvergenceKind> {
    if iteration < min_iterations {
        return None;
    }

    if marginal_error < tolerance {
        return Some(ConvergenceKind::ErrorBelowTolerance);
    }

    if (previous_error - marginal_error).abs() < STAGNATION_THRESHOLD {
        return Some(ConvergenceKind::Stagnation);
    }

    None
}

/// Largest absolute deviation of the column sums of diag(u).K.diag(v) from the target weights
fn target_marginal_error(
    log_kernel: &Array2<f64>,
    log_u: &Array1<f64>,
    log_v: &Array1<f64>,
    target_weights: &Array1<f64>,
) -> Result<f64, OTError> {
    let scaled = log_kernel + &log_u.view().insert_axis(Axis(1)) + &log_v.view().insert_axis(Axis(0));
    let log_col_sums = logsumexp(&scaled, Axis(0))?;

    let deviations = Zip::from(&log_col_sums)
        .and(target_weights)
        .map_collect(|&log_sum, &b| (log_sum.exp() - b).abs());

    match deviations.max() {
        Ok(val) => Ok(*val),
        Err(err) => Err(OTError::ArgError(format!(
            "target marginal error is undefined: {}",
            err
        ))),
    }
}

/// Solves the entropic regularization optimal transport problem in the log domain and returns
/// the transport plan with its convergence metadata
///
/// source: n x d source points
/// target: m x d target points
/// source_weights: Source sample weights (defaults to uniform weight if None)
/// target_weights: Target sample weights (defaults to uniform weight if None)
/// config: epsilon > 0, 0 <= min_iterations <= max_iterations, max_iterations >= 1, tolerance > 0
/// observer: called with (iteration, marginal error) on every convergence check
///
/// Only the target marginal is monitored. Each row of the returned plan is rescaled to sum to
/// one whatever the state of the source marginal.
pub fn sinkhorn_log(
    source: &Array2<f64>,
    target: &Array2<f64>,
    source_weights: Option<&Array1<f64>>,
    target_weights: Option<&Array1<f64>>,
    config: &SinkhornConfig,
    mut observer: Option<&mut dyn FnMut(usize, f64)>,
) -> Result<TransportSolution, OTError> {
    config.validate()?;
    check_inputs(source, target, source_weights, target_weights)?;

    let n = source.nrows();
    let m = target.nrows();
    let epsilon = config.epsilon;
    let max_iterations = config.max_iterations;

    debug!(n, m, epsilon, max_iterations, "starting log-domain sinkhorn");

    let a = normalize_weights(source_weights, n)?;
    let b = normalize_weights(target_weights, m)?;

    let cost = dist(source, target, MetricType::SqEuclidean)?;
    if !all_finite(&cost) {
        return Err(OTError::ArgError(
            "squared distances overflow".to_string(),
        ));
    }

    // log(K) = -M/reg, kept finite so that -inf never meets +inf in the scaling updates
    let log_kernel = cost.mapv_into(|c| (-c / epsilon).max(f64::MIN));

    let log_a = a.mapv(|w| (w + WEIGHT_FLOOR).ln());
    let log_b = b.mapv(|w| (w + WEIGHT_FLOOR).ln());

    let mut log_u = Array1::<f64>::zeros(n);
    let mut log_v = Array1::<f64>::zeros(m);

    let mut previous_error = f64::INFINITY;
    let mut marginal_error = f64::NAN;
    let mut kind = ConvergenceKind::MaxIterationsReached;
    let mut iterations = 0;

    for iteration in 0..max_iterations {
        iterations = iteration + 1;

        // u = a / Kv
        let log_kv = logsumexp(&(&log_kernel + &log_v.view().insert_axis(Axis(0))), Axis(1))?;
        log_u = &log_a - &log_kv;

        // v = b / K^T u
        let log_ktu = logsumexp(&(&log_kernel + &log_u.view().insert_axis(Axis(1))), Axis(0))?;
        log_v = &log_b - &log_ktu;

        if iteration % CHECK_INTERVAL == 0 || iteration == max_iterations - 1 {
            marginal_error = target_marginal_error(&log_kernel, &log_u, &log_v, &b)?;

            trace!(iteration, marginal_error, "sinkhorn marginal check");
            if let Some(observer) = observer.as_deref_mut() {
                observer(iteration, marginal_error);
            }

            if let Some(stop) = check_convergence(
                iteration,
                config.min_iterations,
                marginal_error,
                previous_error,
                config.tolerance,
            ) {
                kind = stop;
                break;
            }

            previous_error = marginal_error;
        }
    }

    // P = exp(log_u[:, None] + log(K) + log_v[None, :])
    let mut plan = (log_kernel + &log_u.insert_axis(Axis(1)) + &log_v.insert_axis(Axis(0)))
        .mapv_into(f64::exp);

    for mut row in plan.axis_iter_mut(Axis(0)) {
        let total = row.sum() + ROW_SUM_FLOOR;
        row.mapv_inplace(|p| p / total);
    }

    if !all_finite(&plan) {
        return Err(OTError::ArgError(
            "transport plan is not finite".to_string(),
        ));
    }

    debug!(iterations, %kind, marginal_error, "sinkhorn finished");

    Ok(TransportSolution {
        plan,
        info: ConvergenceInfo {
            iterations,
            epsilon,
            kind,
            marginal_error,
        },
    })
}
