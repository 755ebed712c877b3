//! Binary parameters and integration settings for the PN model.

use gwframe_core::constants::DEFAULT_V_MAX;
use gwframe_core::{FrameError, FrameResult, OdeConfig, Quaternion, RootConfig, Vector3};
use std::fmt;

/// Highest orbital-evolution PN order implemented.
pub const MAX_ORBITAL_ORDER: f64 = 3.5;

/// Highest mode-amplitude PN order implemented.
pub const MAX_AMPLITUDE_ORDER: f64 = 1.5;

/// PN approximant used for the orbital evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Approximant {
    /// `dv/dt = −F(v)/E'(v)` with both series evaluated numerically each step.
    /// With `spin_terms` off the spins are frozen and drop out of `E` and `F`.
    TaylorT1 { spin_terms: bool },
}

impl fmt::Display for Approximant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaylorT1 { spin_terms: true } => f.write_str("TaylorT1"),
            Self::TaylorT1 { spin_terms: false } => f.write_str("TaylorT1 (no spin terms)"),
        }
    }
}

/// Physical parameters of a PN run.
///
/// Masses may be given in any unit; they are normalized to `m1 + m2 = 1` and
/// all times and frequencies are then in units of the total mass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PnParameters {
    pub m1: f64,
    pub m2: f64,
    /// Dimensionless spin of body 1 in the inertial frame.
    pub chi1: Vector3,
    pub chi2: Vector3,
    /// Orbital angular frequency `M ω` at `t = 0`.
    pub omega_orb_i: f64,
    /// Earlier frequency to integrate back to, if any. Samples before `t = 0`
    /// are then part of the trajectory.
    pub omega_orb_0: Option<f64>,
    /// Rotor taking the co-orbital frame onto the inertial frame at `t = 0`.
    pub frame_i: Quaternion,
    pub orbital_order: f64,
    pub amplitude_order: f64,
    pub approximant: Approximant,
}

impl PnParameters {
    /// Parameters at the highest implemented orders, starting in the standard
    /// frame (orbit in the xy-plane, bodies on the x axis).
    pub fn new(m1: f64, m2: f64, chi1: Vector3, chi2: Vector3, omega_orb_i: f64) -> Self {
        Self {
            m1,
            m2,
            chi1,
            chi2,
            omega_orb_i,
            omega_orb_0: None,
            frame_i: Quaternion::identity(),
            orbital_order: MAX_ORBITAL_ORDER,
            amplitude_order: MAX_AMPLITUDE_ORDER,
            approximant: Approximant::TaylorT1 { spin_terms: true },
        }
    }

    pub fn with_start_frequency(mut self, omega_orb_0: f64) -> Self {
        self.omega_orb_0 = Some(omega_orb_0);
        self
    }

    pub fn with_initial_frame(mut self, frame: Quaternion) -> Self {
        self.frame_i = frame;
        self
    }

    pub fn with_orbital_order(mut self, order: f64) -> Self {
        self.orbital_order = order;
        self
    }

    pub fn with_amplitude_order(mut self, order: f64) -> Self {
        self.amplitude_order = order;
        self
    }

    pub fn with_approximant(mut self, approximant: Approximant) -> Self {
        self.approximant = approximant;
        self
    }

    /// Checks every field and returns the normalized binary.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] describing the first offending field.
    pub fn validate(&self) -> FrameResult<Binary> {
        const CONTEXT: &str = "PnParameters";
        for (name, m) in [("m1", self.m1), ("m2", self.m2)] {
            if !(m.is_finite() && m > 0.0) {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!("{} must be positive and finite, got {}", name, m),
                ));
            }
        }
        for (name, chi) in [("chi1", self.chi1), ("chi2", self.chi2)] {
            if !chi.is_finite() || chi.magnitude() > 1.0 {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!("{} must have magnitude at most 1, got {}", name, chi),
                ));
            }
        }
        if !(self.omega_orb_i.is_finite() && self.omega_orb_i > 0.0) {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!("omega_orb_i must be positive, got {}", self.omega_orb_i),
            ));
        }
        if let Some(omega_0) = self.omega_orb_0 {
            if !(omega_0.is_finite() && omega_0 > 0.0 && omega_0 <= self.omega_orb_i) {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!(
                        "omega_orb_0 must lie in (0, omega_orb_i = {}], got {}",
                        self.omega_orb_i, omega_0
                    ),
                ));
            }
        }
        if !self.frame_i.is_finite() {
            return Err(FrameError::invalid_input(CONTEXT, "frame_i is not finite"));
        }
        let frame_i = self
            .frame_i
            .normalize()
            .map_err(|_| FrameError::invalid_input(CONTEXT, "frame_i is the zero quaternion"))?;
        let orbital_half_orders = half_orders("orbital_order", self.orbital_order, MAX_ORBITAL_ORDER)?;
        let amplitude_half_orders =
            half_orders("amplitude_order", self.amplitude_order, MAX_AMPLITUDE_ORDER)?;

        let total = self.m1 + self.m2;
        let (m1, m2) = (self.m1 / total, self.m2 / total);
        let Approximant::TaylorT1 { spin_terms } = self.approximant;
        Ok(Binary {
            m1,
            m2,
            nu: m1 * m2,
            delta: m1 - m2,
            chi1: self.chi1,
            chi2: self.chi2,
            v_i: libm::cbrt(self.omega_orb_i),
            v_0: self.omega_orb_0.map(libm::cbrt),
            frame_i,
            orbital_half_orders,
            amplitude_half_orders,
            spin_terms,
        })
    }
}

fn half_orders(name: &str, order: f64, max: f64) -> FrameResult<u32> {
    let twice = 2.0 * order;
    if !(order >= 0.0 && order <= max) || twice.fract() != 0.0 {
        return Err(FrameError::invalid_input(
            "PnParameters",
            format!("{} must be a multiple of 0.5 in [0, {}], got {}", name, max, order),
        ));
    }
    Ok(twice as u32)
}

/// Validated binary in units of the total mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binary {
    pub m1: f64,
    pub m2: f64,
    /// Symmetric mass ratio `m1 m2`.
    pub nu: f64,
    /// `m1 − m2`.
    pub delta: f64,
    pub chi1: Vector3,
    pub chi2: Vector3,
    pub v_i: f64,
    pub v_0: Option<f64>,
    pub frame_i: Quaternion,
    /// Orbital PN order times two.
    pub orbital_half_orders: u32,
    pub amplitude_half_orders: u32,
    pub spin_terms: bool,
}

/// Integration settings for a PN run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PnConfig {
    pub ode: OdeConfig,
    /// The run ends `Terminated(MergerApproach)` when `v` reaches this value.
    pub v_max: f64,
    /// The run ends `Complete` at this time, if set.
    pub t_max: Option<f64>,
    /// Lower bound on the number of steps per orbit.
    pub min_steps_per_orbit: u32,
    /// Steps changing `v` by more than this fraction are rejected.
    pub max_relative_dv: f64,
    /// Used to land the final step exactly on `v_max`.
    pub root: RootConfig,
}

impl Default for PnConfig {
    fn default() -> Self {
        Self {
            ode: OdeConfig::default(),
            v_max: DEFAULT_V_MAX,
            t_max: None,
            min_steps_per_orbit: 32,
            max_relative_dv: 0.01,
            root: RootConfig::default(),
        }
    }
}

impl PnConfig {
    pub fn with_ode(mut self, ode: OdeConfig) -> Self {
        self.ode = ode;
        self
    }

    pub fn with_v_max(mut self, v_max: f64) -> Self {
        self.v_max = v_max;
        self
    }

    pub fn with_t_max(mut self, t_max: f64) -> Self {
        self.t_max = Some(t_max);
        self
    }

    pub fn with_min_steps_per_orbit(mut self, n: u32) -> Self {
        self.min_steps_per_orbit = n;
        self
    }

    pub fn with_max_relative_dv(mut self, fraction: f64) -> Self {
        self.max_relative_dv = fraction;
        self
    }

    pub fn with_root(mut self, root: RootConfig) -> Self {
        self.root = root;
        self
    }

    /// Checks the settings against the binary's starting point.
    pub(crate) fn validate(&self, binary: &Binary) -> FrameResult<()> {
        const CONTEXT: &str = "PnConfig";
        if !(self.v_max > binary.v_i && self.v_max < 1.0) {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!(
                    "v_max must lie in (v_i = {}, 1), got {}",
                    binary.v_i, self.v_max
                ),
            ));
        }
        if let Some(t_max) = self.t_max {
            if !(t_max > 0.0) {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!("t_max must be positive, got {}", t_max),
                ));
            }
        }
        if self.min_steps_per_orbit == 0 {
            return Err(FrameError::invalid_input(CONTEXT, "min_steps_per_orbit must be at least 1"));
        }
        if !(self.max_relative_dv > 0.0) {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!("max_relative_dv must be positive, got {}", self.max_relative_dv),
            ));
        }
        Ok(())
    }
}
