//! Rotation algebra and numerical substrate for gravitational-wave frame work.
//!
//! This crate holds the pieces shared by the waveform and PN crates:
//!
//! - [`Quaternion`] and [`QuaternionSeries`] for rotations and frame histories
//! - [`Vector3`] for angular velocities, spins and axes
//! - [`wigner`] for the Wigner D matrices that rotate mode decompositions
//! - [`numerics`] for splines, calculus, root finding, least squares and ODEs
//! - [`FrameError`] / [`FrameResult`], the error type of the whole workspace
//! - the configuration structs passed into every entry point

pub mod config;
pub mod constants;
pub mod errors;
pub mod numerics;
pub mod quaternion;
pub mod utils;
pub mod vector3;
pub mod wigner;

pub use config::{EngineConfig, MinimizerConfig, OdeConfig, RootConfig};
pub use errors::{FrameError, FrameResult};
pub use quaternion::{Quaternion, QuaternionSeries};
pub use vector3::Vector3;
pub use wigner::WignerD;
