//! Post-Newtonian waveforms of precessing quasi-circular binaries.
//!
//! [`PNWaveform`] integrates the TaylorT1 orbital equations together with the
//! spin precession equations and the co-orbital frame, then synthesizes the
//! `ℓ ≤ 4` modes in that frame and hands them to `gwframe-waveform` for the
//! rotation into the inertial frame.
//!
//! Units: `G = c = M = 1`, with `M = m1 + m2`.

pub mod amplitudes;
pub mod approximant;
pub mod evolution;
pub mod params;
pub mod pn_waveform;

pub use amplitudes::SpinProjections;
pub use approximant::TaylorT1;
pub use evolution::{PnEvolution, PnState, TerminationReason, Trajectory};
pub use params::{Approximant, Binary, PnConfig, PnParameters, MAX_AMPLITUDE_ORDER, MAX_ORBITAL_ORDER};
pub use pn_waveform::PNWaveform;
