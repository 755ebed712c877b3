//! Spin-weighted mode waveforms and their rotating frames.
//!
//! A [`Waveform`] holds `h_ℓm(t)` on a time grid together with the frame the
//! modes are decomposed in. From the modes alone the crate computes the
//! angular velocity of the radiation pattern, integrates it into a corotating
//! or co-precessing frame, and rotates the modes into that frame and back.
//!
//! ```
//! use gwframe_core::EngineConfig;
//! use gwframe_waveform::{FrameType, ModeSet, Waveform, WaveformMetadata};
//! use num_complex::Complex64;
//!
//! let times: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
//! let modes = ModeSet::full(2, 2).unwrap();
//! let data = modes
//!     .iter()
//!     .map(|(_, m)| {
//!         let amp = if m.abs() == 2 { 1.0 } else { 0.0 };
//!         times.iter().map(|&t| Complex64::from_polar(amp, -0.05 * m as f64 * t)).collect()
//!     })
//!     .collect();
//! let mut w = Waveform::new(times, modes, data, WaveformMetadata::default()).unwrap();
//!
//! w.transform_to_corotating_frame(&EngineConfig::default()).unwrap();
//! assert_eq!(w.frame_type(), FrameType::Corotating);
//! w.transform_to_inertial_frame().unwrap();
//! assert!(w.frame().is_none());
//! ```

pub mod alignment;
pub mod angular_velocity;
pub mod export;
pub mod frames;
pub mod ingest;
pub mod modes;
pub mod waveform;

pub use alignment::{align, Alignment};
pub use angular_velocity::{angular_velocity, AngularVelocity};
pub use export::{ExportHeader, ExportRecord, TextSink, WaveformSink};
pub use frames::integrate_frame;
pub use ingest::ModeTuple;
pub use modes::ModeSet;
pub use waveform::{FrameType, ModeInterpolator, Waveform, WaveformMetadata};
