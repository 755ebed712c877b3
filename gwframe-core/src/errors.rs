//! Error types for frame and waveform computations.
//!
//! This module provides a unified error type [`FrameError`] covering the failure
//! modes of the engine: malformed input, degenerate algebra, queries outside a
//! sampled domain, and iterative methods that run out of budget.
//!
//! # Error Categories
//!
//! | Variant | Use Case | Recoverable? |
//! |---------|----------|--------------|
//! | [`InvalidInput`](FrameError::InvalidInput) | Bad parameters, inconsistent mode content | Yes |
//! | [`SingularInput`](FrameError::SingularInput) | Zero-norm inverse, all-degenerate data | Yes |
//! | [`OutOfRange`](FrameError::OutOfRange) | Query time outside `[t_min, t_max]` | Yes |
//! | [`Convergence`](FrameError::Convergence) | Root finder / minimizer budget exhausted | Yes |
//! | [`Sink`](FrameError::Sink) | Export sink rejected a record | Yes |
//!
//! Every variant is reported to the caller; none is treated as fatal. The caller
//! decides whether to retry with a wider bracket, looser tolerance, or give up.
//!
//! # Usage
//!
//! Most functions return [`FrameResult<T>`], which is `Result<T, FrameError>`.
//! Use the constructor methods for consistent error creation:
//!
//! ```
//! use gwframe_core::FrameError;
//!
//! fn checked_mass(m: f64) -> Result<f64, FrameError> {
//!     if m <= 0.0 {
//!         return Err(FrameError::invalid_input("checked_mass", "mass must be positive"));
//!     }
//!     Ok(m)
//! }
//!
//! assert!(checked_mass(-1.0).is_err());
//! ```

use thiserror::Error;

/// Unified error type for the frame engine.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Malformed or out-of-domain input, detected before any computation.
    #[error("Invalid input to {context}: {message}")]
    InvalidInput { context: String, message: String },

    /// Degenerate algebraic input, e.g. the inverse of a zero quaternion.
    #[error("Singular input in {operation}: {message}")]
    SingularInput { operation: String, message: String },

    /// A query outside the sampled domain.
    #[error("{context}: value {value} outside [{min}, {max}]")]
    OutOfRange {
        context: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// An iterative method stopped without meeting its tolerance.
    #[error("{method} did not converge after {iterations} iterations: {message}")]
    Convergence {
        method: String,
        iterations: usize,
        message: String,
    },

    /// A serialization sink failed while exporting.
    #[error("Export sink error: {message}")]
    Sink { message: String },
}

/// Convenience alias for `Result<T, FrameError>`.
pub type FrameResult<T> = Result<T, FrameError>;

impl FrameError {
    /// Creates an [`InvalidInput`](Self::InvalidInput) error.
    pub fn invalid_input(context: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.to_string(),
            message: message.into(),
        }
    }

    /// Creates a [`SingularInput`](Self::SingularInput) error.
    pub fn singular_input(operation: &str, message: impl Into<String>) -> Self {
        Self::SingularInput {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Creates an [`OutOfRange`](Self::OutOfRange) error.
    pub fn out_of_range(context: &str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            context: context.to_string(),
            value,
            min,
            max,
        }
    }

    /// Creates a [`Convergence`](Self::Convergence) error.
    pub fn convergence(method: &str, iterations: usize, message: impl Into<String>) -> Self {
        Self::Convergence {
            method: method.to_string(),
            iterations,
            message: message.into(),
        }
    }

    /// Creates a [`Sink`](Self::Sink) error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller may retry with adjusted input.
    ///
    /// All engine failures are recoverable: none leave an object in a
    /// partially mutated state.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidInput { .. }
            | Self::SingularInput { .. }
            | Self::OutOfRange { .. }
            | Self::Convergence { .. }
            | Self::Sink { .. } => true,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::sink(err.to_string())
    }
}
