//! Numerical utilities over sampled time series.
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`spline`] | not-a-knot cubic splines (real, complex, vector) |
//! | [`calculus`] | derivatives and running integrals on a grid |
//! | [`roots`] | Brent's bracketed root finder |
//! | [`minimize`] | Levenberg–Marquardt least squares |
//! | [`ode`] | Dormand–Prince 5(4) stepping and adaptive driver |

pub mod calculus;
pub mod minimize;
pub mod ode;
pub mod roots;
pub mod spline;

pub use minimize::{least_squares, LeastSquaresResult};
pub use ode::{solve_adaptive, DormandPrince, OdeSolution, TrialStep};
pub use roots::{brent, Root};
pub use spline::{ComplexSpline, CubicSpline, VectorSpline};
