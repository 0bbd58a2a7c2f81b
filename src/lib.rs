mod error;
pub mod host;
pub mod metrics;
pub mod reductions;
pub mod regularized;
pub mod transport;
pub mod utils;
pub mod prelude;

pub use error::OTError;

pub trait OTSolver {
    fn check_shape(&self) -> Result<(), OTError>;
    fn solve(&mut self) -> Result<regularized::sinkhorn::TransportSolution, OTError>;
}
