use ndarray::{prelude::*, Data, RemoveAxis, Zip};
use num_traits::Float;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReductionError {
    #[error("axis {axis:?} is out of bounds for an array of dimension {ndim:?}")]
    AxisOutOfBounds { axis: usize, ndim: usize },
}

/// Checks if a given ndarray Axis is valid for an array with `ndim` dimensions
fn check_axis(axis: Axis, ndim: usize) -> Result<(), ReductionError> {
    if axis.index() >= ndim {
        return Err(ReductionError::AxisOutOfBounds {
            axis: axis.index(),
            ndim,
        });
    }

    Ok(())
}

/// Computes log(sum(exp(arr))) along `axis` without overflowing the exponential.
///
/// The lane maximum is subtracted before exponentiating and added back after the
/// logarithm, so values of any magnitude stay in range. The reduced axis is
/// removed from the result. A lane of length one is returned as is.
///
/// Lanes whose maximum is not finite (for instance a lane of `-inf`) are shifted
/// by zero, so an all `-inf` lane reduces to `-inf` rather than NaN.
///
/// ```rust
/// use sinkhorn_point_transport::reductions::logsumexp;
/// use ndarray::{array, Axis};
///
/// let arr = array![[1000., 1000.], [0., f64::NEG_INFINITY]];
/// let lse = logsumexp(&arr, Axis(1)).unwrap();
///
/// assert!((lse[0] - (1000. + 2f64.ln())).abs() < 1E-9);
/// assert_eq!(lse[1], 0.);
/// ```
pub fn logsumexp<S, D, A>(
    arr: &ArrayBase<S, D>,
    axis: Axis,
) -> Result<Array<A, D::Smaller>, ReductionError>
where
    A: Float,
    S: Data<Elem = A>,
    D: Dimension + RemoveAxis,
{
    check_axis(axis, arr.ndim())?;

    if arr.len_of(axis) == 1 {
        return Ok(arr.index_axis(axis, 0).to_owned());
    }

    let shift = arr
        .fold_axis(axis, A::neg_infinity(), |&acc, &x| acc.max(x))
        .mapv_into(|m| if m.is_finite() { m } else { A::zero() });

    let mut linear = arr.to_owned();
    Zip::from(linear.lanes_mut(axis))
        .and(&shift)
        .for_each(|mut lane, &m| lane.mapv_inplace(|x| (x - m).exp()));

    let summed = linear.sum_axis(axis);

    Ok(Zip::from(&summed)
        .and(&shift)
        .map_collect(|&s, &m| s.ln() + m))
}

/// Computes log(sum(exp(arr))) over every element of the array
pub fn logsumexp_all<S, D, A>(arr: &ArrayBase<S, D>) -> A
where
    A: Float,
    S: Data<Elem = A>,
    D: Dimension,
{
    let max = arr.fold(A::neg_infinity(), |acc, &x| acc.max(x));
    let shift = if max.is_finite() { max } else { A::zero() };

    let summed = arr.fold(A::zero(), |acc, &x| acc + (x - shift).exp());

    summed.ln() + shift
}

/// Returns true if every element is finite (neither infinite nor NaN).
/// Returns true for empty arrays
pub fn all_finite<S, D, A>(arr: &ArrayBase<S, D>) -> bool
where
    A: Float,
    S: Data<Elem = A>,
    D: Dimension,
{
    arr.iter().all(|ele| ele.is_finite())
}
