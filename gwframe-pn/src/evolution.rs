//! Orbital evolution state machine.
//!
//! The state vector is
//!
//! ```text
//! y = [v, Φ, χ1x, χ1y, χ1z, χ2x, χ2y, χ2z, Rw, Rx, Ry, Rz]
//! ```
//!
//! with `dv/dt = −F/E'`, `dΦ/dt = v³`, `χ̇_i = Ω_i × χ_i`, and the co-orbital
//! frame obeying `dR/dt = ½ Ω_frame R`, `Ω_frame = v³ ℓ̂ + ℓ̂ × dℓ̂/dt`,
//! `ℓ̂ = R ẑ R̄`.
//!
//! A run moves `Initialized → Integrating → Complete | Terminated(reason)`.
//! Every accepted step is recorded, so a terminated run keeps the trajectory up
//! to its last good step.

use crate::approximant::TaylorT1;
use crate::params::{Binary, PnConfig, PnParameters};
use gwframe_core::constants::TWOPI;
use gwframe_core::numerics::{brent, DormandPrince, TrialStep};
use gwframe_core::{FrameResult, Quaternion, Vector3};
use std::fmt;
use tracing::{debug, info, warn};

pub(crate) const STATE_DIM: usize = 12;

/// Why a run stopped before reaching `t_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// `v` reached the configured `v_max`.
    MergerApproach,
    /// `E'(v) ≥ 0`, `F ≤ 0` or `v ≤ 0`.
    NonPhysicalState,
    /// Non-finite derivatives, or a step that cannot be made small enough.
    NumericalSingularity,
    StepBudgetExhausted,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MergerApproach => "merger approach",
            Self::NonPhysicalState => "non-physical state",
            Self::NumericalSingularity => "numerical singularity",
            Self::StepBudgetExhausted => "step budget exhausted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PnState {
    Initialized,
    Integrating,
    Complete,
    Terminated(TerminationReason),
}

impl PnState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Terminated(_))
    }
}

impl fmt::Display for PnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => f.write_str("initialized"),
            Self::Integrating => f.write_str("integrating"),
            Self::Complete => f.write_str("complete"),
            Self::Terminated(reason) => write!(f, "terminated ({})", reason),
        }
    }
}

/// Sampled orbital history.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub v: Vec<f64>,
    pub phase: Vec<f64>,
    pub chi1: Vec<Vector3>,
    pub chi2: Vec<Vector3>,
    pub frame: Vec<Quaternion>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    fn push(&mut self, t: f64, y: &[f64]) {
        let s = State::from_slice(y);
        self.t.push(t);
        self.v.push(s.v);
        self.phase.push(s.phase);
        self.chi1.push(s.chi1);
        self.chi2.push(s.chi2);
        self.frame.push(s.frame);
    }

    fn pop(&mut self) {
        self.t.pop();
        self.v.pop();
        self.phase.pop();
        self.chi1.pop();
        self.chi2.pop();
        self.frame.pop();
    }

    /// Reverses a backward leg in place and drops its `t = 0` sample.
    fn into_reversed_prefix(mut self) -> Self {
        self.t.reverse();
        self.v.reverse();
        self.phase.reverse();
        self.chi1.reverse();
        self.chi2.reverse();
        self.frame.reverse();
        self.pop();
        self
    }

    fn append(&mut self, mut other: Self) {
        self.t.append(&mut other.t);
        self.v.append(&mut other.v);
        self.phase.append(&mut other.phase);
        self.chi1.append(&mut other.chi1);
        self.chi2.append(&mut other.chi2);
        self.frame.append(&mut other.frame);
    }
}

/// Typed view of the state vector.
#[derive(Debug, Clone, Copy)]
struct State {
    v: f64,
    phase: f64,
    chi1: Vector3,
    chi2: Vector3,
    frame: Quaternion,
}

impl State {
    fn from_slice(y: &[f64]) -> Self {
        Self {
            v: y[0],
            phase: y[1],
            chi1: Vector3::new(y[2], y[3], y[4]),
            chi2: Vector3::new(y[5], y[6], y[7]),
            frame: Quaternion::new(y[8], y[9], y[10], y[11]),
        }
    }

    fn to_vec(self) -> Vec<f64> {
        let Self { v, phase, chi1, chi2, frame } = self;
        vec![
            v, phase, chi1.x, chi1.y, chi1.z, chi2.x, chi2.y, chi2.z, frame.w, frame.x, frame.y, frame.z,
        ]
    }
}

/// Frame quantities at one state, shared by the right-hand side and the
/// trajectory accessors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Kinematics {
    pub ell_hat: Vector3,
    pub chi1_dot: Vector3,
    pub chi2_dot: Vector3,
    pub omega_orb: Vector3,
    pub omega_prec: Vector3,
}

pub(crate) fn kinematics(model: &TaylorT1, v: f64, chi1: &Vector3, chi2: &Vector3, frame: &Quaternion) -> Kinematics {
    let ell_hat = frame.rotate(Vector3::z_axis()) / frame.norm_squared();
    let (omega1, omega2) = model.precession(v, chi1, chi2, &ell_hat);
    let chi1_dot = omega1.cross(chi1);
    let chi2_dot = omega2.cross(chi2);
    let ell_dot = model.ell_hat_derivative(v, &chi1_dot, &chi2_dot);
    Kinematics {
        ell_hat,
        chi1_dot,
        chi2_dot,
        omega_orb: ell_hat * (v * v * v),
        omega_prec: ell_hat.cross(&ell_dot),
    }
}

fn right_hand_side(model: &TaylorT1, y: &[f64], dy: &mut [f64]) -> Result<(), TerminationReason> {
    let s = State::from_slice(y);
    if !(s.v > 0.0) {
        return Err(TerminationReason::NonPhysicalState);
    }
    let k = kinematics(model, s.v, &s.chi1, &s.chi2, &s.frame);
    let e_prime = model.energy_derivative(s.v, &s.chi1, &s.chi2, &k.ell_hat);
    let flux = model.flux(s.v, &s.chi1, &s.chi2, &k.ell_hat);
    if !e_prime.is_finite() || !flux.is_finite() {
        return Err(TerminationReason::NumericalSingularity);
    }
    if e_prime >= 0.0 || flux <= 0.0 {
        return Err(TerminationReason::NonPhysicalState);
    }

    let r_dot = Quaternion::from_vector(k.omega_orb + k.omega_prec) * s.frame * 0.5;
    let derivative = State {
        v: -flux / e_prime,
        phase: s.v * s.v * s.v,
        chi1: k.chi1_dot,
        chi2: k.chi2_dot,
        frame: r_dot,
    };
    dy.copy_from_slice(&derivative.to_vec());
    if dy.iter().any(|d| !d.is_finite()) {
        return Err(TerminationReason::NumericalSingularity);
    }
    Ok(())
}

/// Renormalizes the frame part of a state vector.
fn normalize_frame(y: &mut [f64]) {
    let n = (y[8] * y[8] + y[9] * y[9] + y[10] * y[10] + y[11] * y[11]).sqrt();
    if n > 0.0 {
        for c in &mut y[8..12] {
            *c /= n;
        }
    }
}

/// How a leg of the integration ended.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LegEnd {
    /// Landed on the target `v`.
    Target,
    /// Reached `t_max`.
    TimeLimit,
    Failed(TerminationReason),
}

/// One direction of integration from `t = 0`.
struct Leg {
    /// `+1` forward in time, `−1` backward.
    direction: f64,
    v_target: f64,
    t_limit: Option<f64>,
}

/// Integrator for one PN run.
#[derive(Debug, Clone)]
pub struct PnEvolution {
    model: TaylorT1,
    config: PnConfig,
    state: PnState,
    trajectory: Trajectory,
    accepted: usize,
    rejected: usize,
}

impl PnEvolution {
    /// Validates the inputs; no step is taken until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`](gwframe_core::FrameError::InvalidInput) for
    /// invalid parameters or settings.
    pub fn new(params: &PnParameters, config: PnConfig) -> FrameResult<Self> {
        let binary = params.validate()?;
        config.validate(&binary)?;
        Ok(Self {
            model: TaylorT1::new(binary),
            config,
            state: PnState::Initialized,
            trajectory: Trajectory::default(),
            accepted: 0,
            rejected: 0,
        })
    }

    pub fn state(&self) -> PnState {
        self.state
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    pub fn model(&self) -> &TaylorT1 {
        &self.model
    }

    pub fn binary(&self) -> &Binary {
        self.model.binary()
    }

    /// Accepted steps so far.
    pub fn steps(&self) -> usize {
        self.accepted
    }

    pub fn rejected_steps(&self) -> usize {
        self.rejected
    }

    /// Runs to completion and returns the final state. Calling it again on a
    /// finished run does nothing.
    pub fn run(&mut self) -> PnState {
        if self.state.is_finished() {
            return self.state;
        }
        self.state = PnState::Integrating;
        let b = *self.model.binary();
        let y0 = State {
            v: b.v_i,
            phase: 0.0,
            chi1: b.chi1,
            chi2: b.chi2,
            frame: b.frame_i,
        }
        .to_vec();

        if let Some(v_0) = b.v_0.filter(|&v_0| v_0 < b.v_i) {
            let backward = Leg {
                direction: -1.0,
                v_target: v_0,
                t_limit: None,
            };
            let (samples, end) = self.integrate_leg(&backward, &y0);
            debug!(samples = samples.len(), end = ?end, "backward leg finished");
            self.trajectory = samples.into_reversed_prefix();
            if let LegEnd::Failed(reason) = end {
                // keep the backward samples and stop
                self.trajectory.push(0.0, &y0);
                return self.finish(PnState::Terminated(reason));
            }
        }

        let forward = Leg {
            direction: 1.0,
            v_target: self.config.v_max,
            t_limit: self.config.t_max,
        };
        let (samples, end) = self.integrate_leg(&forward, &y0);
        self.trajectory.append(samples);
        let state = match end {
            LegEnd::Target => PnState::Terminated(TerminationReason::MergerApproach),
            LegEnd::TimeLimit => PnState::Complete,
            LegEnd::Failed(reason) => PnState::Terminated(reason),
        };
        self.finish(state)
    }

    fn finish(&mut self, state: PnState) -> PnState {
        self.state = state;
        info!(
            state = %state,
            steps = self.accepted,
            rejected = self.rejected,
            samples = self.trajectory.len(),
            v_final = self.trajectory.v.last().copied().unwrap_or(f64::NAN),
            "PN evolution finished"
        );
        state
    }

    /// Largest step allowed by the steps-per-orbit cap at speed `v`.
    fn orbit_cap(&self, v: f64) -> f64 {
        TWOPI / (v * v * v * self.config.min_steps_per_orbit as f64)
    }

    fn integrate_leg(&mut self, leg: &Leg, y0: &[f64]) -> (Trajectory, LegEnd) {
        let model = self.model;
        let ode = self.config.ode;
        let mut rhs = |_t: f64, y: &[f64], dy: &mut [f64]| right_hand_side(&model, y, dy);
        let mut stepper = DormandPrince::new(ode, STATE_DIM);

        let mut samples = Trajectory::default();
        let mut t = 0.0;
        let mut y = y0.to_vec();
        samples.push(t, &y);
        let mut k1 = vec![0.0; STATE_DIM];
        if let Err(reason) = rhs(t, &y, &mut k1) {
            return (samples, LegEnd::Failed(reason));
        }

        let mut stage_failure = None;
        let mut h = if ode.initial_step > 0.0 {
            ode.initial_step
        } else {
            self.orbit_cap(y[0])
        };

        loop {
            if self.accepted >= ode.max_steps {
                return (samples, LegEnd::Failed(TerminationReason::StepBudgetExhausted));
            }
            h = h.min(self.orbit_cap(y[0])).min(ode.max_step);
            let remaining = leg.t_limit.map(|t_max| t_max - t);
            let clipped = match remaining {
                Some(r) if h >= r => {
                    h = r;
                    true
                }
                _ => false,
            };
            if h < ode.min_step {
                let reason = stage_failure.unwrap_or(TerminationReason::NumericalSingularity);
                warn!(t, h, reason = %reason, "PN step fell below the minimum step");
                return (samples, LegEnd::Failed(reason));
            }

            let trial = match stepper.try_step(&mut rhs, t, &y, &k1, leg.direction * h) {
                Ok(trial) => trial,
                Err(reason) => {
                    // a stage left the physical domain; retry smaller
                    stage_failure = Some(reason);
                    self.rejected += 1;
                    h *= 0.25;
                    continue;
                }
            };
            stage_failure = None;
            let dv = (trial.y[0] - y[0]).abs() / y[0];
            if !trial.is_acceptable() || dv > self.config.max_relative_dv {
                self.rejected += 1;
                h = stepper.next_step_size(h, trial.error).min(0.5 * h);
                continue;
            }

            let crossed = leg.direction * (trial.y[0] - leg.v_target) >= 0.0;
            if crossed {
                let (h_final, mut y_final) =
                    self.land_on_target(&mut stepper, &mut rhs, t, &y, &k1, leg, h, trial);
                normalize_frame(&mut y_final);
                self.accepted += 1;
                let t_final = t + leg.direction * h_final;
                if t_final == t {
                    samples.pop();
                }
                samples.push(t_final, &y_final);
                return (samples, LegEnd::Target);
            }

            let next_h = stepper.next_step_size(h, trial.error);
            t = match (clipped, leg.t_limit) {
                (true, Some(t_max)) => t_max,
                _ => t + leg.direction * h,
            };
            y = trial.y;
            normalize_frame(&mut y);
            k1 = trial.dydt;
            self.accepted += 1;
            samples.push(t, &y);
            if clipped {
                return (samples, LegEnd::TimeLimit);
            }
            h = next_h;
        }
    }

    /// Finds the step size whose end point has `v` exactly on the leg's target.
    #[allow(clippy::too_many_arguments)]
    fn land_on_target<F>(
        &self,
        stepper: &mut DormandPrince,
        rhs: &mut F,
        t: f64,
        y: &[f64],
        k1: &[f64],
        leg: &Leg,
        h: f64,
        overshoot: TrialStep,
    ) -> (f64, Vec<f64>)
    where
        F: FnMut(f64, &[f64], &mut [f64]) -> Result<(), TerminationReason>,
    {
        let v_target = leg.v_target;
        let mut miss = |step: f64| match stepper.try_step(&mut *rhs, t, y, k1, leg.direction * step) {
            Ok(trial) => trial.y[0] - v_target,
            Err(_) => f64::NAN,
        };
        match brent(&mut miss, 0.0, h, &self.config.root) {
            Ok(root) => match stepper.try_step(rhs, t, y, k1, leg.direction * root.x) {
                Ok(trial) => {
                    let mut y_final = trial.y;
                    y_final[0] = v_target;
                    (root.x, y_final)
                }
                Err(_) => (h, overshoot.y),
            },
            Err(err) => {
                warn!(error = %err, "could not land on target v; keeping the overshooting step");
                (h, overshoot.y)
            }
        }
    }
}
