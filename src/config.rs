// src/config.rs

//! Configuration for a PCA run.
//!
//! Everything a settings panel would toggle (component count, normalization,
//! solver knobs) is passed explicitly with each call; the engine keeps no
//! state between runs.

use serde::{Deserialize, Serialize};

use crate::error::{PcaError, Result};

/// Default number of power-iteration steps per component.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Floor used when renormalizing a deflated vector.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Standard deviations at or below this value are treated as zero.
pub const ZERO_VARIANCE_THRESHOLD: f64 = 1e-9;

/// Default cumulative-variance threshold for [`crate::optimal_components`].
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.95;

/// How the starting vector of each power iteration is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Initialization {
    /// Entries drawn from `Uniform[0, 1)`. With `seed: None` the generator is
    /// seeded from entropy and eigenvector signs may differ between runs.
    Random { seed: Option<u64> },
    /// The all-ones vector, orthogonalized against the eigenvectors found so
    /// far. Falls back to standard basis vectors when the ones direction is
    /// already spanned. Fully deterministic.
    OrthogonalizedOnes,
}

impl Default for Initialization {
    fn default() -> Self {
        Initialization::Random { seed: None }
    }
}

/// What to do with a constant feature when scaling to unit variance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroVariancePolicy {
    /// Replace the scale factor by `1.0`; the feature is only centered.
    #[default]
    Sanitize,
    /// Fail with [`PcaError::DegenerateInput`].
    Reject,
}

/// What to do when more components are requested than features exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentPolicy {
    /// Extract as many components as there are features and log a warning.
    #[default]
    Clamp,
    /// Fail with [`PcaError::InvalidComponents`].
    Reject,
}

/// Parameters of a single PCA computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Number of principal components to extract (k).
    pub n_components: usize,
    /// Scale every feature to unit sample variance after centering.
    pub normalize: bool,
    /// Power-iteration steps per component. Acts as an upper bound when
    /// `tolerance` is set.
    pub max_iterations: usize,
    /// Optional early-exit threshold on the change of the unit eigenvector
    /// between two steps. `None` always runs `max_iterations` steps.
    pub tolerance: Option<f64>,
    /// Norm below which a deflated vector is considered exhausted.
    pub epsilon: f64,
    /// Starting-vector strategy for the solver.
    pub initialization: Initialization,
    /// Handling of constant features under `normalize`.
    pub zero_variance_policy: ZeroVariancePolicy,
    /// Handling of `n_components` larger than the feature count.
    pub component_policy: ComponentPolicy,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            n_components: 2,
            normalize: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: None,
            epsilon: DEFAULT_EPSILON,
            initialization: Initialization::default(),
            zero_variance_policy: ZeroVariancePolicy::default(),
            component_policy: ComponentPolicy::default(),
        }
    }
}

impl PcaConfig {
    /// Default configuration with the two settings a caller always chooses.
    pub fn new(n_components: usize, normalize: bool) -> Self {
        PcaConfig {
            n_components,
            normalize,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.initialization = Initialization::Random { seed: Some(seed) };
        self
    }

    pub fn with_initialization(mut self, initialization: Initialization) -> Self {
        self.initialization = initialization;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_zero_variance_policy(mut self, policy: ZeroVariancePolicy) -> Self {
        self.zero_variance_policy = policy;
        self
    }

    pub fn with_component_policy(mut self, policy: ComponentPolicy) -> Self {
        self.component_policy = policy;
        self
    }

    /// Checks the parameters that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(PcaError::InvalidComponents {
                requested: 0,
                available: 0,
            });
        }
        if self.max_iterations == 0 {
            return Err(PcaError::InvalidConfig {
                parameter: "max_iterations".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(PcaError::InvalidConfig {
                parameter: "epsilon".to_string(),
                message: format!("must be a positive finite number, got {}", self.epsilon),
            });
        }
        if let Some(tol) = self.tolerance {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(PcaError::InvalidConfig {
                    parameter: "tolerance".to_string(),
                    message: format!("must be a positive finite number, got {}", tol),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_solver() {
        let config = PcaConfig::default();
        assert_eq!(config.n_components, 2);
        assert!(config.normalize);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.tolerance, None);
        assert_eq!(config.initialization, Initialization::Random { seed: None });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert!(matches!(
            PcaConfig::new(0, true).validate(),
            Err(PcaError::InvalidComponents { requested: 0, .. })
        ));
        assert!(matches!(
            PcaConfig::new(2, true).with_max_iterations(0).validate(),
            Err(PcaError::InvalidConfig { ref parameter, .. }) if parameter == "max_iterations"
        ));
        assert!(matches!(
            PcaConfig::new(2, true).with_tolerance(-1.0).validate(),
            Err(PcaError::InvalidConfig { ref parameter, .. }) if parameter == "tolerance"
        ));
        let mut config = PcaConfig::new(2, false);
        config.epsilon = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn builders_compose() {
        let config = PcaConfig::new(3, false)
            .with_seed(7)
            .with_component_policy(ComponentPolicy::Reject)
            .with_zero_variance_policy(ZeroVariancePolicy::Reject);
        assert_eq!(config.initialization, Initialization::Random { seed: Some(7) });
        assert_eq!(config.component_policy, ComponentPolicy::Reject);
        assert_eq!(config.zero_variance_policy, ZeroVariancePolicy::Reject);
        assert!(!config.normalize);
    }
}
