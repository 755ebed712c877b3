//! Tunable parameters passed explicitly into each entry point.
//!
//! Every struct has a [`Default`] suited to double-precision waveform data and
//! builder-style `with_*` setters:
//!
//! ```
//! use gwframe_core::{EngineConfig, MinimizerConfig};
//!
//! let config = EngineConfig::default()
//!     .with_frame_ell_max(2)
//!     .with_minimizer(MinimizerConfig::default().with_max_iterations(50));
//! assert_eq!(config.frame_ell_max, 2);
//! ```

/// Brent root-finding tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootConfig {
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-14,
            rel_tolerance: 4.0 * f64::EPSILON,
            max_iterations: 100,
        }
    }
}

impl RootConfig {
    pub fn with_abs_tolerance(mut self, tol: f64) -> Self {
        self.abs_tolerance = tol;
        self
    }

    pub fn with_rel_tolerance(mut self, tol: f64) -> Self {
        self.rel_tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }
}

/// Levenberg–Marquardt settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinimizerConfig {
    /// Gradient and relative-step tolerance.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Starting damping factor λ.
    pub initial_damping: f64,
    /// Relative forward-difference step for the Jacobian.
    pub jacobian_step: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
            initial_damping: 1e-3,
            jacobian_step: 1e-7,
        }
    }
}

impl MinimizerConfig {
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_initial_damping(mut self, lambda: f64) -> Self {
        self.initial_damping = lambda;
        self
    }

    pub fn with_jacobian_step(mut self, step: f64) -> Self {
        self.jacobian_step = step;
        self
    }
}

/// Adaptive Dormand–Prince settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OdeConfig {
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    pub min_step: f64,
    pub max_step: f64,
    /// First trial step; non-positive means one hundredth of the interval.
    pub initial_step: f64,
    pub max_steps: usize,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-10,
            rel_tolerance: 1e-10,
            min_step: 1e-10,
            max_step: f64::INFINITY,
            initial_step: 0.0,
            max_steps: 1_000_000,
        }
    }
}

impl OdeConfig {
    pub fn with_tolerances(mut self, abs: f64, rel: f64) -> Self {
        self.abs_tolerance = abs;
        self.rel_tolerance = rel;
        self
    }

    pub fn with_step_bounds(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    pub fn with_initial_step(mut self, h: f64) -> Self {
        self.initial_step = h;
        self
    }

    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }
}

/// Settings for waveform frame computations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Largest `ℓ` accepted on ingestion.
    pub ell_max: i32,
    /// Largest `ℓ` entering the angular-velocity sums; 2 restricts them to the
    /// quadrupole.
    pub frame_ell_max: i32,
    /// Per-sample mode norm below which the sample is degenerate.
    pub degenerate_tolerance: f64,
    /// Tolerance for unit-norm and identity checks on frame quaternions.
    pub quaternion_tolerance: f64,
    pub root: RootConfig,
    pub minimizer: MinimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ell_max: 8,
            frame_ell_max: 8,
            degenerate_tolerance: crate::constants::DEGENERATE_TOLERANCE,
            quaternion_tolerance: crate::constants::QUATERNION_TOLERANCE,
            root: RootConfig::default(),
            minimizer: MinimizerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_ell_max(mut self, ell_max: i32) -> Self {
        self.ell_max = ell_max;
        self
    }

    pub fn with_frame_ell_max(mut self, ell: i32) -> Self {
        self.frame_ell_max = ell;
        self
    }

    pub fn with_degenerate_tolerance(mut self, tol: f64) -> Self {
        self.degenerate_tolerance = tol;
        self
    }

    pub fn with_quaternion_tolerance(mut self, tol: f64) -> Self {
        self.quaternion_tolerance = tol;
        self
    }

    pub fn with_root(mut self, root: RootConfig) -> Self {
        self.root = root;
        self
    }

    pub fn with_minimizer(mut self, minimizer: MinimizerConfig) -> Self {
        self.minimizer = minimizer;
        self
    }
}
