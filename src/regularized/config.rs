//! Parameters of the log-domain Sinkhorn solver

use crate::error::OTError;

/// Parameters controlling one Sinkhorn solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkhornConfig {
    /// Entropic regularization strength (> 0). Larger values give smoother, more diffuse plans
    pub epsilon: f64,
    /// Iteration index from which the stopping rules may end the loop
    pub min_iterations: usize,
    /// Maximum number of iterations (>= 1)
    pub max_iterations: usize,
    /// Stop threshold on the target marginal error (> 0)
    pub tolerance: f64,
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.05,
            min_iterations: 3,
            max_iterations: 200,
            tolerance: 1E-12,
        }
    }
}

impl SinkhornConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults used when matching point clouds, e.g. frame to frame in a simulation
    pub fn point_cloud() -> Self {
        Self {
            epsilon: 0.03,
            tolerance: 1E-8,
            ..Self::default()
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_min_iterations(mut self, min_iterations: usize) -> Self {
        self.min_iterations = min_iterations;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), OTError> {
        if !(self.epsilon > 0.) || !self.epsilon.is_finite() {
            return Err(OTError::InvalidConfiguration(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }

        if self.max_iterations < 1 {
            return Err(OTError::InvalidConfiguration(
                "max_iterations must be >= 1".to_string(),
            ));
        }

        if self.min_iterations > self.max_iterations {
            return Err(OTError::InvalidConfiguration(format!(
                "min_iterations ({}) > max_iterations ({})",
                self.min_iterations, self.max_iterations
            )));
        }

        if !(self.tolerance > 0.) || !self.tolerance.is_finite() {
            return Err(OTError::InvalidConfiguration(format!(
                "tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::SinkhornConfig;
    use crate::error::OTError;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SinkhornConfig::default().validate().is_ok());
        assert!(SinkhornConfig::point_cloud().validate().is_ok());
        assert_eq!(SinkhornConfig::point_cloud().max_iterations, 200);
    }

    #[test]
    fn test_invalid_configurations() {
        let invalid = [
            SinkhornConfig::new().with_epsilon(0.),
            SinkhornConfig::new().with_epsilon(-1.),
            SinkhornConfig::new().with_epsilon(f64::NAN),
            SinkhornConfig::new().with_max_iterations(0).with_min_iterations(0),
            SinkhornConfig::new().with_min_iterations(11).with_max_iterations(10),
            SinkhornConfig::new().with_tolerance(0.),
        ];

        for config in invalid.iter() {
            match config.validate() {
                Err(OTError::InvalidConfiguration(_)) => (),
                other => panic!("{:?} accepted: {:?}", config, other),
            }
        }
    }

    #[test]
    fn test_min_equal_max_is_valid() {
        let config = SinkhornConfig::new()
            .with_min_iterations(1)
            .with_max_iterations(1);

        assert!(config.validate().is_ok());
    }
}
